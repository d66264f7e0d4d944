//! Resources exposed by the LoginTC admin API.
//!
//! # Design
//! Response types deserialize straight from the API's JSON. The service is
//! loose about scalar types in a few places (domain policy numbers arrive as
//! strings, hardware time steps as numbers), so those fields go through the
//! `lenient` helpers instead of failing the whole mapping.
//!
//! Request payloads are separate types that only serialize the fields the
//! API expects.

use serde::{Deserialize, Serialize};

/// The organization owning the API key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub name: String,
}

/// A person or account. Corresponds one-to-one with an application user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub bypasscodes: Vec<String>,
    /// Identifier of the associated hardware token, if any.
    #[serde(default, deserialize_with = "lenient::empty_as_none")]
    pub hardware: Option<String>,
}

/// Fields for creating a user, or for listing when replacing a domain's
/// membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Partial user update. Omitted fields stay unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A protected service (VPN, website, ...) with its users and token policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub key_type: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_allowed_retries: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub request_timeout: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub activation_code_expiration: Option<u32>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub request_polling_enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub bypass_enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TokenState {
    /// A load code was issued but the token has not been loaded yet.
    Pending,
    /// The load code has been used.
    Active,
}

/// A credential tied to a domain and user pair, living in the LoginTC app.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Token {
    pub state: TokenState,
    /// Code for loading the token; only present while pending.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SessionState {
    Pending,
    Approved,
    Denied,
}

// The service is not consistent about the casing of state names.
impl TryFrom<String> for TokenState {
    type Error = String;

    fn try_from(state: String) -> Result<Self, Self::Error> {
        match state.to_ascii_lowercase().as_str() {
            "pending" => Ok(TokenState::Pending),
            "active" => Ok(TokenState::Active),
            _ => Err(format!("unknown token state {state:?}")),
        }
    }
}

impl TryFrom<String> for SessionState {
    type Error = String;

    fn try_from(state: String) -> Result<Self, Self::Error> {
        match state.to_ascii_lowercase().as_str() {
            "pending" => Ok(SessionState::Pending),
            "approved" => Ok(SessionState::Approved),
            "denied" => Ok(SessionState::Denied),
            _ => Err(format!("unknown session state {state:?}")),
        }
    }
}

/// An authentication request pushed to a user's device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
}

/// Key/value pair shown to the user alongside a session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A 9-digit fallback code a user can log in with when their device is
/// unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BypassCode {
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub dt_expiry: Option<String>,
    pub user: String,
    pub uses_allowed: i32,
    pub uses_remaining: i32,
}

/// Parameters for issuing a bypass code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBypassCode {
    pub uses_allowed: i32,
    /// Days until the code expires; 0 means never.
    pub expiration_time: i32,
}

impl Default for NewBypassCode {
    fn default() -> Self {
        Self {
            uses_allowed: 1,
            expiration_time: 0,
        }
    }
}

/// A TOTP (RFC 6238) device. Each user can have at most one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareToken {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub serial_number: String,
    /// `TOTP6` or `TOTP8`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "lenient::string")]
    pub time_step: String,
    #[serde(default)]
    pub sync_state: Option<String>,
    #[serde(default, deserialize_with = "lenient::empty_as_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHardwareToken {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub serial_number: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub time_step: u32,
    pub seed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardwareTokenUpdate {
    pub alias: String,
}

/// Request body for `POST /api/domains/{id}/sessions`.
#[derive(Debug, Serialize)]
pub(crate) struct NewSession<'a> {
    pub user: SessionUser<'a>,
    pub attributes: &'a [Attribute],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum SessionUser<'a> {
    Id { id: &'a str },
    Username { username: &'a str },
}

/// `GET` on a session only reports its state.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionStatus {
    pub state: SessionState,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PingResponse {
    pub status: String,
}

mod lenient {
    use serde::de::{self, Deserializer};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Number(serde_json::Number),
        Text(String),
    }

    pub fn empty_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(d)?;
        Ok(value.filter(|s| !s.is_empty()))
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        match Option::<Scalar>::deserialize(d)? {
            None => Ok(None),
            Some(Scalar::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("expected unsigned integer, got {n}"))),
            Some(Scalar::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("expected unsigned integer, got {s:?}"))),
            Some(Scalar::Bool(b)) => Err(de::Error::custom(format!("expected unsigned integer, got {b}"))),
        }
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Scalar>::deserialize(d)? {
            None => Ok(None),
            Some(Scalar::Bool(b)) => Ok(Some(b)),
            Some(Scalar::Text(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(Scalar::Text(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(Scalar::Text(s)) => Err(de::Error::custom(format!("expected boolean, got {s:?}"))),
            Some(Scalar::Number(n)) => Err(de::Error::custom(format!("expected boolean, got {n}"))),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Scalar::deserialize(d)? {
            Scalar::Text(s) => Ok(s),
            Scalar::Number(n) => Ok(n.to_string()),
            Scalar::Bool(b) => Err(de::Error::custom(format!("expected string, got {b}"))),
        }
    }
}
