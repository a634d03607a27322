// HTTP plumbing: one authenticated request per call, status codes mapped to errors
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use quick_xml::de::from_str;
use reqwest::blocking::{Client, Request};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HOST, USER_AGENT};
use reqwest::Method;
use serde::Deserialize;

use crate::config::{ClientConfig, Credentials};
use crate::encoding::normalize_response;
use crate::error::{ChargifyError, Result};

pub const XML_CONTENT_TYPE: &str = r#"text/xml; charset="UTF-8""#;
pub const XML_ACCEPT: &str = "application/xml";
// Basic auth password; Chargify only looks at the API key
pub const AUTH_PASSWORD: &str = "x";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    // Absolute path including query, e.g. `/customers/lookup.xml?reference=abc`
    pub path: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub body: Bytes,
}

/// Sends a single request and reports the raw status and body. Implementations must
/// not retry.
pub trait Transport: Send + Sync + fmt::Debug {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

// reqwest blocking client bound to one account
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    // Authenticated request with every header Chargify expects
    pub fn build(&self, request: &ApiRequest) -> Result<Request> {
        let url = format!("{}{}", self.config.base_url(), request.path);
        let credentials = &self.config.credentials;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .basic_auth(&credentials.api_key, Some(AUTH_PASSWORD))
            .header(USER_AGENT, self.config.user_agent.as_str())
            .header(HOST, self.config.request_host())
            .header(ACCEPT, XML_ACCEPT);
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, XML_CONTENT_TYPE)
                .body(body.clone());
        }
        Ok(builder.build()?)
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let response = self.client.execute(self.build(request)?)?;
        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);
        let body = response.bytes()?;
        Ok(ApiResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

/// Credentials plus a transport. Cheap to clone; every resource holds one.
#[derive(Clone)]
pub struct Connection {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.config.request_host())
            .field("transport", &self.transport)
            .finish()
    }
}

impl Connection {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = Arc::new(config);
        let transport = Arc::new(HttpTransport::new(config.clone())?);
        Ok(Self { config, transport })
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.config.credentials
    }

    pub fn request_host(&self) -> String {
        self.config.request_host()
    }

    // Returns the normalized response body, or the error mapped from the status code
    pub fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<String> {
        tracing::debug!(%method, path, "Requesting to {}", path);
        let request = ApiRequest {
            method,
            path: path.to_string(),
            body,
        };
        let response = self.transport.execute(&request)?;
        let body = normalize_response(&response.body);
        check_status(response.status, response.reason.as_deref(), &body)?;
        Ok(body)
    }

    pub fn get(&self, path: &str) -> Result<String> {
        self.request(Method::GET, path, None)
    }

    pub fn post(&self, path: &str, body: String) -> Result<String> {
        self.request(Method::POST, path, Some(body))
    }

    pub fn put(&self, path: &str, body: Option<String>) -> Result<String> {
        self.request(Method::PUT, path, body)
    }

    pub fn delete(&self, path: &str, body: Option<String>) -> Result<String> {
        self.request(Method::DELETE, path, body)
    }
}

/// Maps a status code to its error. Unlisted 4xx/5xx statuses become
/// `UnexpectedStatus` instead of passing their bodies through as successes.
pub fn check_status(status: u16, reason: Option<&str>, body: &str) -> Result<()> {
    match status {
        401 => Err(ChargifyError::AuthenticationFailed),
        403 => Err(ChargifyError::EndpointForbidden),
        404 => Err(ChargifyError::ResourceNotFound),
        422 => Err(ChargifyError::ValidationFailed {
            errors: validation_errors(body),
        }),
        405 | 500 => {
            tracing::debug!(status, reason = reason.unwrap_or(""), "response status");
            Err(ChargifyError::ServerError { status })
        }
        400..=599 => Err(ChargifyError::UnexpectedStatus(status)),
        _ => Ok(()),
    }
}

// 422 body: `<errors><error>...</error></errors>`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename = "errors")]
struct XmlErrors {
    #[serde(rename = "error")]
    errors: Vec<String>,
}

fn validation_errors(body: &str) -> Vec<String> {
    match from_str::<XmlErrors>(body) {
        Ok(parsed) => parsed
            .errors
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}
