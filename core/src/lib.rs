//! Synchronous admin client for the LoginTC two-factor authentication API.
//!
//! # Overview
//! `LoginTc` manages users, domains, tokens, sessions, bypass codes and
//! hardware tokens. Underneath, `AdminRestClient` builds authenticated
//! `HttpRequest` values and classifies `HttpResponse` statuses; a `Transport`
//! performs the network round-trip (blocking ureq by default).
//!
//! # Design
//! - Request building and status classification are pure, so the
//!   authentication and header rules are testable without a network.
//! - Every failure reaches the caller as one `Error`: `Internal` for
//!   transport and mapping defects, `Api` when the service rejected the
//!   request, `NoToken` when the user has no usable token for the domain.
//! - Configuration, including the user agent, is an explicit `ClientConfig`
//!   value. There is no retry, caching or rate limiting.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod rest;
pub mod transport;
pub mod types;

pub use client::LoginTc;
pub use config::{ClientConfig, ConfigError, ProxyConfig, ProxyCredentials};
pub use endpoint::{Endpoint, Scheme};
pub use error::{classify, ApiError, Error, InternalError, TransportError, NO_TOKEN_CODE};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use rest::{check_status, AdminRestClient, CONTENT_TYPE};
pub use transport::UreqTransport;
pub use types::{
    Attribute, BypassCode, Domain, HardwareToken, HardwareTokenUpdate, NewBypassCode, NewHardwareToken, NewUser,
    Organization, Session, SessionState, Token, TokenState, User, UserUpdate,
};
