//! Client for the guestbook REST backend.

use log::{debug, info, warn};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::intake::SubmissionPayload;
use crate::reference::ReferenceDataResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server responded with status {code}")]
    Status { code: u16, message: Option<String> },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message supplied by the server, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Body of `POST /guestbook/store`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// The two endpoints the intake workflow consumes.
pub trait GuestbookApi: Send + Sync {
    fn fetch_reference_data(&self) -> Result<ReferenceDataResponse, ApiError>;
    fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, ApiError>;
}

/// Blocking HTTP implementation. Call it from a worker thread.
pub struct HttpGuestbookApi {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpGuestbookApi {
    pub fn new(config: &ApiConfig) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.timeout_connect(Duration::from_secs(secs));
        }
        if let Some(secs) = config.read_timeout_secs {
            builder = builder.timeout_read(Duration::from_secs(secs));
        }

        Self {
            agent: builder.build(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl GuestbookApi for HttpGuestbookApi {
    fn fetch_reference_data(&self) -> Result<ReferenceDataResponse, ApiError> {
        let url = self.url("guestbook/data");
        debug!("GET {}", url);

        let response = self.agent.get(&url).call().map_err(into_api_error)?;
        response
            .into_json::<ReferenceDataResponse>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, ApiError> {
        let url = self.url("guestbook/store");
        info!("Submitting guestbook entry (role: {})", payload.role);

        let response = self.agent.post(&url).send_json(payload).map_err(into_api_error)?;
        response
            .into_json::<SubmitResponse>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn into_api_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(code, response) => {
            // Validation failures come back as 4xx with the usual body.
            let message = response
                .into_json::<SubmitResponse>()
                .ok()
                .and_then(|body| body.message)
                .filter(|m| !m.is_empty());
            warn!("Server responded with status {}", code);
            ApiError::Status { code, message }
        }
        ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
    }
}
