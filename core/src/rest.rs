//! Authenticated REST exchange with the LoginTC admin API.
//!
//! # Design
//! Each verb is split into a `build_*` method that produces an `HttpRequest`
//! and a shared `send` step that executes it through the `Transport` and
//! applies `check_status`. Building is pure, so header and URL rules can be
//! verified without a network.
//!
//! The API key is the only source of authorization; the client keeps no
//! session state between calls.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use crate::config::{ClientConfig, ProxyConfig};
use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::transport::UreqTransport;

/// Media type the API requires for both request and response bodies.
pub const CONTENT_TYPE: &str = "application/vnd.logintc.v1+json";

pub struct AdminRestClient<T = UreqTransport> {
    endpoint: Endpoint,
    api_key: SecretString,
    user_agent: String,
    transport: T,
}

impl<T: Transport> AdminRestClient<T> {
    pub fn new(endpoint: Endpoint, api_key: SecretString, user_agent: impl Into<String>, transport: T) -> Self {
        Self {
            endpoint,
            api_key,
            user_agent: user_agent.into(),
            transport,
        }
    }

    pub fn from_config(config: &ClientConfig, transport: T) -> Self {
        Self::new(
            config.endpoint(),
            config.api_key.clone(),
            config.user_agent.clone(),
            transport,
        )
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_get(&self, path: &str, query: Option<&str>) -> Result<HttpRequest, TransportError> {
        self.build(HttpMethod::Get, path, query, None, CONTENT_TYPE)
    }

    /// GET for a non-JSON payload; `Accept` carries `content_type` instead of
    /// the API media type.
    pub fn build_get_bytes(&self, path: &str, content_type: &str) -> Result<HttpRequest, TransportError> {
        self.build(HttpMethod::Get, path, None, None, content_type)
    }

    pub fn build_post(&self, path: &str, body: Option<Vec<u8>>) -> Result<HttpRequest, TransportError> {
        self.build(HttpMethod::Post, path, None, body, CONTENT_TYPE)
    }

    pub fn build_put(&self, path: &str, body: Option<Vec<u8>>) -> Result<HttpRequest, TransportError> {
        self.build(HttpMethod::Put, path, None, body, CONTENT_TYPE)
    }

    pub fn build_delete(&self, path: &str) -> Result<HttpRequest, TransportError> {
        self.build(HttpMethod::Delete, path, None, None, CONTENT_TYPE)
    }

    pub fn get(&self, path: &str, query: Option<&str>) -> Result<Vec<u8>, TransportError> {
        self.send(self.build_get(path, query)?)
    }

    pub fn get_bytes(&self, path: &str, content_type: &str) -> Result<Vec<u8>, TransportError> {
        self.send(self.build_get_bytes(path, content_type)?)
    }

    pub fn post(&self, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>, TransportError> {
        self.send(self.build_post(path, body)?)
    }

    pub fn put(&self, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>, TransportError> {
        self.send(self.build_put(path, body)?)
    }

    pub fn delete(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        self.send(self.build_delete(path)?)
    }

    fn build(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&str>,
        body: Option<Vec<u8>>,
        accept: &str,
    ) -> Result<HttpRequest, TransportError> {
        let url = self.endpoint.url(path, query)?;

        let mut headers = vec![
            ("Host".to_string(), self.endpoint.host_header()),
            ("User-Agent".to_string(), self.user_agent.clone()),
            (
                "Authorization".to_string(),
                format!("LoginTC key=\"{}\"", self.api_key.expose_secret()),
            ),
            ("Accept".to_string(), accept.to_string()),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), CONTENT_TYPE.to_string()));
        }
        if method == HttpMethod::Delete {
            headers.push(("Content-Length".to_string(), "0".to_string()));
        }

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    #[instrument(level = "debug", skip_all, fields(method = %request.method, url = %request.url))]
    fn send(&self, request: HttpRequest) -> Result<Vec<u8>, TransportError> {
        debug!("sending request");
        let response = self.transport.execute(&request)?;
        debug!(
            status = response.status,
            content_type = response.header("Content-Type"),
            bytes = response.body.len(),
            "received response"
        );
        check_status(response)
    }
}

impl AdminRestClient<UreqTransport> {
    /// See [`UreqTransport::set_proxy`].
    pub fn set_proxy(&mut self, proxy: ProxyConfig) -> Result<(), TransportError> {
        self.transport.set_proxy(proxy)
    }
}

/// Pass the body of 200, 201 and 202 responses through; every other status,
/// known or not, becomes `TransportError::Status`.
pub fn check_status(response: HttpResponse) -> Result<Vec<u8>, TransportError> {
    match response.status {
        200 | 201 | 202 => Ok(response.body),
        status => Err(TransportError::Status {
            status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }),
    }
}
