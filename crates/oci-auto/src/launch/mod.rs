//! Launch request construction and the retry loop

mod retrier;
mod spec;

pub use retrier::{
    LaunchError, LaunchReport, LaunchRetrier, LaunchState, SUCCESS_MESSAGE, classify_attempt,
};
pub use spec::ResourceRequest;
