//! `LoginTc`: typed operations over the LoginTC admin API.
//!
//! # Design
//! Every operation is a path, an optional JSON body and a mapping of the
//! response into a resource type. All failures funnel through `Error`:
//! transport and status failures via `From<TransportError>` (which runs the
//! error classifier), JSON mapping failures via `From<serde_json::Error>`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::config::{ClientConfig, ProxyConfig};
use crate::error::Error;
use crate::http::Transport;
use crate::rest::AdminRestClient;
use crate::transport::UreqTransport;
use crate::types::{
    Attribute, BypassCode, Domain, HardwareToken, HardwareTokenUpdate, NewBypassCode, NewHardwareToken,
    NewSession, NewUser, Organization, PingResponse, Session, SessionStatus, SessionUser, Token, User,
    UserUpdate,
};

/// Content type requested for domain images.
pub const DOMAIN_IMAGE_TYPE: &str = "image/png";

/// Client for the LoginTC admin API.
///
/// Calls block until the full response has been read. Proxy settings need
/// `&mut self`, so they cannot change while requests are in flight.
pub struct LoginTc<T = UreqTransport> {
    rest: AdminRestClient<T>,
}

impl LoginTc<UreqTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = match &config.proxy {
            Some(proxy) => UreqTransport::with_proxy(proxy.clone())?,
            None => UreqTransport::new(),
        };
        Ok(Self {
            rest: AdminRestClient::from_config(&config, transport),
        })
    }

    /// Route subsequent requests through an HTTP proxy.
    pub fn set_proxy(&mut self, proxy: ProxyConfig) -> Result<(), Error> {
        Ok(self.rest.set_proxy(proxy)?)
    }
}

impl<T: Transport> LoginTc<T> {
    /// Use a caller-supplied transport instead of the default ureq one.
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            rest: AdminRestClient::from_config(config, transport),
        }
    }

    pub fn rest(&self) -> &AdminRestClient<T> {
        &self.rest
    }

    /// `true` when the API reports status `OK`.
    pub fn ping(&self) -> Result<bool, Error> {
        let ping: PingResponse = decode(&self.rest.get("/api/ping", None)?)?;
        Ok(ping.status == "OK")
    }

    pub fn get_organization(&self) -> Result<Organization, Error> {
        decode(&self.rest.get("/api/organization", None)?)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn get_user(&self, user_id: &str) -> Result<User, Error> {
        decode(&self.rest.get(&format!("/api/users/{user_id}"), None)?)
    }

    /// One page of the organization's users; pages start at 1.
    pub fn get_users(&self, page: u32) -> Result<Vec<User>, Error> {
        decode(&self.rest.get("/api/users", Some(&format!("page={page}")))?)
    }

    pub fn create_user(&self, user: &NewUser) -> Result<User, Error> {
        decode(&self.rest.post("/api/users", Some(encode(user)?))?)
    }

    pub fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<User, Error> {
        decode(&self.rest.put(&format!("/api/users/{user_id}"), Some(encode(update)?))?)
    }

    pub fn delete_user(&self, user_id: &str) -> Result<(), Error> {
        self.rest.delete(&format!("/api/users/{user_id}"))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Domains
    // -----------------------------------------------------------------------

    pub fn get_domain(&self, domain_id: &str) -> Result<Domain, Error> {
        decode(&self.rest.get(&format!("/api/domains/{domain_id}"), None)?)
    }

    /// Raw PNG bytes of the domain's image.
    pub fn get_domain_image(&self, domain_id: &str) -> Result<Vec<u8>, Error> {
        Ok(self
            .rest
            .get_bytes(&format!("/api/domains/{domain_id}/image"), DOMAIN_IMAGE_TYPE)?)
    }

    pub fn get_domain_user(&self, domain_id: &str, user_id: &str) -> Result<User, Error> {
        decode(&self.rest.get(&format!("/api/domains/{domain_id}/users/{user_id}"), None)?)
    }

    /// First page of the domain's users.
    pub fn get_domain_users(&self, domain_id: &str) -> Result<Vec<User>, Error> {
        self.get_domain_users_page(domain_id, 1)
    }

    pub fn get_domain_users_page(&self, domain_id: &str, page: u32) -> Result<Vec<User>, Error> {
        decode(&self.rest.get(
            &format!("/api/domains/{domain_id}/users"),
            Some(&format!("page={page}")),
        )?)
    }

    pub fn add_domain_user(&self, domain_id: &str, user_id: &str) -> Result<(), Error> {
        self.rest
            .put(&format!("/api/domains/{domain_id}/users/{user_id}"), None)?;
        Ok(())
    }

    /// Replace the domain's membership. Users that do not exist yet are
    /// created; members missing from `users` are removed and their tokens
    /// revoked.
    pub fn set_domain_users(&self, domain_id: &str, users: &[NewUser]) -> Result<(), Error> {
        self.rest
            .put(&format!("/api/domains/{domain_id}/users"), Some(encode(&users)?))?;
        Ok(())
    }

    pub fn remove_domain_user(&self, domain_id: &str, user_id: &str) -> Result<(), Error> {
        self.rest
            .delete(&format!("/api/domains/{domain_id}/users/{user_id}"))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tokens
    // -----------------------------------------------------------------------

    /// Issue a token if none exists or the previous one was revoked. Does
    /// nothing to a token that is active or still pending.
    pub fn create_user_token(&self, domain_id: &str, user_id: &str) -> Result<Token, Error> {
        let token = decode(&self.rest.put(&token_path(domain_id, user_id), None)?)?;
        Ok(normalize_token(token))
    }

    /// Fails with `Error::NoToken` when the user has no token in the domain.
    pub fn get_user_token(&self, domain_id: &str, user_id: &str) -> Result<Token, Error> {
        let token = decode(&self.rest.get(&token_path(domain_id, user_id), None)?)?;
        Ok(normalize_token(token))
    }

    /// Revoke the user's token.
    pub fn delete_user_token(&self, domain_id: &str, user_id: &str) -> Result<(), Error> {
        self.rest.delete(&token_path(domain_id, user_id))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Push an authentication request to the user's device.
    ///
    /// Fails with `Error::NoToken` when the user has no usable token.
    #[instrument(level = "debug", skip(self, attributes))]
    pub fn create_session(&self, domain_id: &str, user_id: &str, attributes: &[Attribute]) -> Result<Session, Error> {
        self.post_session(domain_id, SessionUser::Id { id: user_id }, attributes)
    }

    #[instrument(level = "debug", skip(self, attributes))]
    pub fn create_session_with_username(
        &self,
        domain_id: &str,
        username: &str,
        attributes: &[Attribute],
    ) -> Result<Session, Error> {
        self.post_session(domain_id, SessionUser::Username { username }, attributes)
    }

    pub fn get_session(&self, domain_id: &str, session_id: &str) -> Result<Session, Error> {
        let response: SessionStatus =
            decode(&self.rest.get(&format!("/api/domains/{domain_id}/sessions/{session_id}"), None)?)?;
        Ok(Session {
            id: session_id.to_string(),
            state: response.state,
        })
    }

    /// Cancel a session.
    pub fn delete_session(&self, domain_id: &str, session_id: &str) -> Result<(), Error> {
        self.rest
            .delete(&format!("/api/domains/{domain_id}/sessions/{session_id}"))?;
        Ok(())
    }

    fn post_session(&self, domain_id: &str, user: SessionUser<'_>, attributes: &[Attribute]) -> Result<Session, Error> {
        let body = encode(&NewSession { user, attributes })?;
        decode(&self.rest.post(&format!("/api/domains/{domain_id}/sessions"), Some(body))?)
    }

    // -----------------------------------------------------------------------
    // Bypass codes
    // -----------------------------------------------------------------------

    pub fn create_user_bypass_code(&self, user_id: &str, params: &NewBypassCode) -> Result<BypassCode, Error> {
        decode(&self.rest.post(
            &format!("/api/users/{user_id}/bypasscodes"),
            Some(encode(params)?),
        )?)
    }

    pub fn get_bypass_code(&self, bypass_code_id: &str) -> Result<BypassCode, Error> {
        decode(&self.rest.get(&format!("/api/bypasscodes/{bypass_code_id}"), None)?)
    }

    pub fn get_user_bypass_codes(&self, user_id: &str) -> Result<Vec<BypassCode>, Error> {
        decode(&self.rest.get(&format!("/api/users/{user_id}/bypasscodes"), None)?)
    }

    pub fn delete_bypass_code(&self, bypass_code_id: &str) -> Result<(), Error> {
        self.rest.delete(&format!("/api/bypasscodes/{bypass_code_id}"))?;
        Ok(())
    }

    pub fn delete_user_bypass_codes(&self, user_id: &str) -> Result<(), Error> {
        self.rest.delete(&format!("/api/users/{user_id}/bypasscodes"))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Hardware tokens
    // -----------------------------------------------------------------------

    pub fn create_hardware_token(&self, token: &NewHardwareToken) -> Result<HardwareToken, Error> {
        decode(&self.rest.post("/api/hardware", Some(encode(token)?))?)
    }

    pub fn get_hardware_token(&self, hardware_token_id: &str) -> Result<HardwareToken, Error> {
        decode(&self.rest.get(&format!("/api/hardware/{hardware_token_id}"), None)?)
    }

    pub fn get_hardware_tokens(&self, page: u32) -> Result<Vec<HardwareToken>, Error> {
        decode(&self.rest.get("/api/hardware", Some(&format!("page={page}")))?)
    }

    pub fn update_hardware_token(&self, hardware_token_id: &str, alias: &str) -> Result<HardwareToken, Error> {
        let body = encode(&HardwareTokenUpdate {
            alias: alias.to_string(),
        })?;
        decode(&self.rest.put(&format!("/api/hardware/{hardware_token_id}"), Some(body))?)
    }

    pub fn delete_hardware_token(&self, hardware_token_id: &str) -> Result<(), Error> {
        self.rest.delete(&format!("/api/hardware/{hardware_token_id}"))?;
        Ok(())
    }

    pub fn associate_hardware_token(&self, user_id: &str, hardware_token_id: &str) -> Result<(), Error> {
        self.rest
            .put(&format!("/api/users/{user_id}/hardware/{hardware_token_id}"), None)?;
        Ok(())
    }

    pub fn disassociate_hardware_token(&self, user_id: &str) -> Result<(), Error> {
        self.rest.delete(&format!("/api/users/{user_id}/hardware"))?;
        Ok(())
    }

    pub fn get_user_hardware_token(&self, user_id: &str) -> Result<HardwareToken, Error> {
        decode(&self.rest.get(&format!("/api/users/{user_id}/hardware"), None)?)
    }
}

fn token_path(domain_id: &str, user_id: &str) -> String {
    format!("/api/domains/{domain_id}/users/{user_id}/token")
}

// Load codes are displayed and typed in upper case.
fn normalize_token(mut token: Token) -> Token {
    token.code = token.code.map(|code| code.to_uppercase());
    token
}

fn decode<D: DeserializeOwned>(body: &[u8]) -> Result<D, Error> {
    Ok(serde_json::from_slice(body)?)
}

fn encode<S: Serialize + ?Sized>(value: &S) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(value)?)
}
