//! OCI Core Services compute client

mod operations;
mod types;

pub use operations::ComputeOperations;
pub use types::{
    AgentConfig, AvailabilityConfig, CreateVnicDetails, InstanceOptions, InstanceShapeConfig,
    InstanceSummary, LaunchInstanceDetails, LaunchShapeConfig, LaunchedInstance, PluginConfig,
    SourceDetails,
};

use crate::oci::context::OciContext;
use crate::oci::error::{OciError, classify_service_error};
use crate::oci::signer::RequestSigner;
use oci_auto_common::defaults::{API_VERSION, DEFAULT_REQUEST_TIMEOUT_SECS, LIST_PAGE_LIMIT};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE};
use reqwest::{Method, Response, Url};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};
use types::ErrorBody;

const OPC_REQUEST_ID: &str = "opc-request-id";
const OPC_NEXT_PAGE: &str = "opc-next-page";

/// Compute client for listing and launching instances
///
/// Holds one HTTP session for its whole lifetime; [`ComputeClient::close`]
/// releases it and every later call fails with [`OciError::SessionClosed`].
pub struct ComputeClient {
    http: Mutex<Option<reqwest::Client>>,
    signer: Arc<RequestSigner>,
    instances_url: Url,
    launch_url: Url,
}

impl ComputeClient {
    /// Create a client for the given endpoint (e.g. `https://iaas.eu-frankfurt-1.oraclecloud.com`)
    pub fn new(endpoint: &Url, signer: Arc<RequestSigner>) -> Result<Self, OciError> {
        let base = format!("{}/{}", endpoint.as_str().trim_end_matches('/'), API_VERSION);
        let parse = |path: &str| {
            Url::parse(&format!("{base}{path}"))
                .map_err(|e| OciError::Transport(format!("Invalid endpoint '{endpoint}': {e}")))
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("oci-auto/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http: Mutex::new(Some(http)),
            signer,
            instances_url: parse("/instances")?,
            launch_url: parse("/instances/")?,
        })
    }

    /// Create a compute client from a loaded OCI context
    pub fn from_context(ctx: &OciContext) -> Result<Self, OciError> {
        Self::new(ctx.endpoint(), ctx.signer())
    }

    /// List all instances in a compartment
    pub async fn list_instances(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<InstanceSummary>, OciError> {
        let mut instances = Vec::new();
        let mut page: Option<String> = None;

        loop {
            let mut url = self.instances_url.clone();
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("compartmentId", compartment_id)
                    .append_pair("limit", &LIST_PAGE_LIMIT.to_string());
                if let Some(page) = &page {
                    query.append_pair("page", page);
                }
            }

            let response = self.send(Method::GET, url, None).await?;
            let next_page = header_value(&response, OPC_NEXT_PAGE);
            let batch: Vec<InstanceSummary> = response.json().await?;
            debug!(count = batch.len(), more = next_page.is_some(), "Fetched instance page");
            instances.extend(batch);

            match next_page {
                Some(next) => page = Some(next),
                None => break,
            }
        }

        Ok(instances)
    }

    /// Submit one launch request
    pub async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
    ) -> Result<LaunchedInstance, OciError> {
        let body = serde_json::to_vec(details)
            .map_err(|e| OciError::Transport(format!("Failed to encode launch request: {e}")))?;

        let response = self
            .send(Method::POST, self.launch_url.clone(), Some(body))
            .await?;
        let request_id = header_value(&response, OPC_REQUEST_ID);

        let mut instance: LaunchedInstance = response.json().await?;
        instance.request_id = request_id;

        info!(
            instance_id = %instance.id,
            state = %instance.lifecycle_state,
            "Instance launched"
        );
        Ok(instance)
    }

    /// Release the HTTP session. Idempotent.
    pub fn close(&self) -> bool {
        let released = self.http.lock().unwrap().take().is_some();
        if released {
            debug!("Closed compute HTTP session");
        }
        released
    }

    pub fn is_closed(&self) -> bool {
        self.http.lock().unwrap().is_none()
    }

    fn session(&self) -> Result<reqwest::Client, OciError> {
        self.http
            .lock()
            .unwrap()
            .as_ref()
            .cloned()
            .ok_or(OciError::SessionClosed)
    }

    /// Sign and send a request, turning non-2xx responses into classified errors.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Response, OciError> {
        let client = self.session()?;
        let signed = self.signer.sign(&method, &url, body.as_deref());

        let mut request = client
            .request(method, url)
            .header(DATE, &signed.date)
            .header(AUTHORIZATION, &signed.authorization);

        if let Some(content) = &signed.content {
            request = request
                .header("x-content-sha256", &content.sha256)
                .header(CONTENT_TYPE, content.content_type)
                .header(CONTENT_LENGTH, content.length);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }
}

impl std::fmt::Debug for ComputeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeClient")
            .field("instances_url", &self.instances_url.as_str())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn error_from_response(response: Response) -> OciError {
    let status = response.status().as_u16();
    let request_id = header_value(&response, OPC_REQUEST_ID);
    let text = response.text().await.unwrap_or_default();

    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()));

    classify_service_error(
        status,
        body.code.as_deref(),
        message.as_deref(),
        request_id.as_deref(),
    )
}
