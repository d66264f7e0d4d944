//! Blocking `Transport` backed by ureq.
//!
//! # Design
//! Status codes are returned as data (`http_status_as_error(false)`) so the
//! REST layer alone decides what a failure is. TLS uses ureq's rustls
//! defaults, which always verify certificates and hostnames. The proxy is
//! never taken from the environment; it is either configured explicitly or
//! absent.

use secrecy::ExposeSecret;
use tracing::{debug, warn};
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, ProxyProtocol, RequestBuilder};
use url::Url;

use crate::config::ProxyConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

pub struct UreqTransport {
    agent: Agent,
    proxy: Option<ProxyConfig>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: build_agent(None),
            proxy: None,
        }
    }

    pub fn with_proxy(proxy: ProxyConfig) -> Result<Self, TransportError> {
        let mut transport = Self::new();
        transport.set_proxy(proxy)?;
        Ok(transport)
    }

    /// Route all subsequent requests through `proxy`. Proxy credentials, if
    /// any, are sent as basic proxy authorization.
    pub fn set_proxy(&mut self, proxy: ProxyConfig) -> Result<(), TransportError> {
        let ureq_proxy = build_proxy(&proxy)?;
        debug!(
            host = %proxy.host,
            port = proxy.port,
            authenticated = proxy.credentials.is_some(),
            "configured outbound proxy"
        );
        self.agent = build_agent(Some(ureq_proxy));
        self.proxy = Some(proxy);
        Ok(())
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => without_body(self.agent.get(url), request).call(),
            (HttpMethod::Delete, _) => without_body(self.agent.delete(url), request).call(),
            (HttpMethod::Post, Some(body)) => with_body(self.agent.post(url), request).send(body),
            (HttpMethod::Post, None) => with_body(self.agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => with_body(self.agent.put(url), request).send(body),
            (HttpMethod::Put, None) => with_body(self.agent.put(url), request).send_empty(),
        };

        let mut response = result.map_err(|e| {
            warn!(method = %request.method, url, error = %e, "HTTP exchange failed");
            TransportError::http(e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(TransportError::http)?;

        Ok(HttpResponse { status, headers, body })
    }
}

fn build_agent(proxy: Option<ureq::Proxy>) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .proxy(proxy)
        .build()
        .new_agent()
}

fn without_body(builder: RequestBuilder<WithoutBody>, request: &HttpRequest) -> RequestBuilder<WithoutBody> {
    request
        .headers
        .iter()
        .fold(builder, |b, (name, value)| b.header(name.as_str(), value.as_str()))
}

fn with_body(builder: RequestBuilder<WithBody>, request: &HttpRequest) -> RequestBuilder<WithBody> {
    request
        .headers
        .iter()
        .fold(builder, |b, (name, value)| b.header(name.as_str(), value.as_str()))
}

/// HTTP proxy at `host:port`. Credentials go to ureq verbatim; it encodes
/// them into `Proxy-Authorization` itself.
fn build_proxy(proxy: &ProxyConfig) -> Result<ureq::Proxy, TransportError> {
    let invalid = || TransportError::Proxy(format!("{}:{}", proxy.host, proxy.port));
    let target = Url::parse(&format!("http://{}:{}", proxy.host, proxy.port)).map_err(|_| invalid())?;
    let host = target.host_str().ok_or_else(invalid)?;

    let mut builder = ureq::Proxy::builder(ProxyProtocol::Http).host(host).port(proxy.port);
    if let Some(credentials) = &proxy.credentials {
        builder = builder
            .username(&credentials.username)
            .password(credentials.password.expose_secret());
    }
    builder.build().map_err(|e| TransportError::Proxy(e.to_string()))
}
