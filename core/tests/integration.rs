//! Full admin lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `LoginTc`
//! operation it supports over real HTTP through the default ureq transport.
//! The shared store lets the test play the mobile app (loading a token,
//! answering a push) between calls.

use std::net::SocketAddr;

use logintc_core::{
    Attribute, ClientConfig, Error, InternalError, LoginTc, NewBypassCode, NewHardwareToken, NewUser, SessionState,
    TokenState, Transport, TransportError, UserUpdate,
};
use mock_server::{Db, API_KEY, DOMAIN_ID, DOMAIN_IMAGE, MEDIA_TYPE, ORGANIZATION_NAME};

fn start_server() -> (SocketAddr, Db) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let db = Db::default();
    let server_db = db.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_store(listener, server_db).await
        })
        .unwrap();
    });

    (addr, db)
}

fn client_for(addr: SocketAddr, api_key: &str) -> LoginTc {
    let config = ClientConfig::new(api_key)
        .with_host(&addr.to_string())
        .unwrap()
        .with_secure(false);
    LoginTc::new(config).unwrap()
}

fn api_code(err: &Error) -> &str {
    err.api_error()
        .map(|api| api.code.as_str())
        .unwrap_or_else(|| panic!("expected API error, got {err:?}"))
}

#[test]
fn admin_lifecycle() {
    let (addr, db) = start_server();
    let client = client_for(addr, API_KEY);

    // Step 1: service and organization.
    assert!(client.ping().unwrap());
    assert_eq!(client.get_organization().unwrap().name, ORGANIZATION_NAME);

    // Step 2: domain and its image.
    let domain = client.get_domain(DOMAIN_ID).unwrap();
    assert_eq!(domain.id, DOMAIN_ID);
    assert_eq!(domain.max_allowed_retries, Some(5));
    assert_eq!(domain.bypass_enabled, Some(true));
    assert_eq!(client.get_domain_image(DOMAIN_ID).unwrap(), DOMAIN_IMAGE.to_vec());

    // Step 3: create, fetch and update a user.
    let created = client
        .create_user(&NewUser::new("jdoe", "jdoe@example.com", "John Doe"))
        .unwrap();
    assert_eq!(created.username, "jdoe");
    assert_eq!(created.hardware, None);
    assert_eq!(client.get_user(&created.id).unwrap(), created);

    let updated = client
        .update_user(
            &created.id,
            &UserUpdate {
                email: None,
                name: Some("Johnny Doe".to_string()),
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Johnny Doe");
    assert_eq!(updated.email, "jdoe@example.com");
    assert_eq!(client.get_users(1).unwrap().len(), 1);

    // Step 4: duplicate usernames are rejected by the API.
    let err = client
        .create_user(&NewUser::new("jdoe", "other@example.com", "Other"))
        .unwrap_err();
    assert!(matches!(err, Error::Api(_)));
    assert_eq!(api_code(&err), "api.error.conflict.user");

    // Step 5: domain membership.
    client.add_domain_user(DOMAIN_ID, &created.id).unwrap();
    let member = client.get_domain_user(DOMAIN_ID, &created.id).unwrap();
    assert_eq!(member.domains, vec![DOMAIN_ID.to_string()]);
    assert_eq!(client.get_domain_users(DOMAIN_ID).unwrap().len(), 1);

    // Step 6: no token yet.
    let err = client.get_user_token(DOMAIN_ID, &created.id).unwrap_err();
    assert!(err.is_no_token(), "{err:?}");

    // Step 7: issue a token; the load code comes back upper-cased.
    let token = client.create_user_token(DOMAIN_ID, &created.id).unwrap();
    assert_eq!(token.state, TokenState::Pending);
    let code = token.code.expect("pending token has a load code");
    assert_eq!(code.len(), 9);
    assert_eq!(code, code.to_uppercase());

    // Step 8: an unloaded token cannot receive a push.
    let attributes = [Attribute::new("Product", "Quinoa"), Attribute::new("Price", "42")];
    let err = client
        .create_session(DOMAIN_ID, &created.id, &attributes)
        .unwrap_err();
    assert!(err.is_no_token(), "{err:?}");

    // Step 9: the user loads the token on their device.
    assert!(db.blocking_write().activate_token(DOMAIN_ID, &created.id));
    let token = client.get_user_token(DOMAIN_ID, &created.id).unwrap();
    assert_eq!(token.state, TokenState::Active);
    assert_eq!(token.code, None);

    // Step 10: push, approve, cancel.
    let session = client
        .create_session(DOMAIN_ID, &created.id, &attributes)
        .unwrap();
    assert_eq!(session.state, SessionState::Pending);
    assert_eq!(
        client.get_session(DOMAIN_ID, &session.id).unwrap().state,
        SessionState::Pending
    );
    assert!(db.blocking_write().answer_session(DOMAIN_ID, &session.id, true));
    let polled = client.get_session(DOMAIN_ID, &session.id).unwrap();
    assert_eq!(polled.id, session.id);
    assert_eq!(polled.state, SessionState::Approved);

    client.delete_session(DOMAIN_ID, &session.id).unwrap();
    let err = client.get_session(DOMAIN_ID, &session.id).unwrap_err();
    assert_eq!(api_code(&err), "api.error.notfound.session");

    let by_name = client
        .create_session_with_username(DOMAIN_ID, "jdoe", &[])
        .unwrap();
    assert_eq!(by_name.state, SessionState::Pending);

    // Step 11: revoke the token.
    client.delete_user_token(DOMAIN_ID, &created.id).unwrap();
    assert!(client
        .get_user_token(DOMAIN_ID, &created.id)
        .unwrap_err()
        .is_no_token());

    // Step 12: leave the domain, then replace the membership wholesale.
    client.remove_domain_user(DOMAIN_ID, &created.id).unwrap();
    let err = client.get_domain_user(DOMAIN_ID, &created.id).unwrap_err();
    assert_eq!(api_code(&err), "api.error.notfound.user");

    client
        .set_domain_users(
            DOMAIN_ID,
            &[
                NewUser::new("jdoe", "jdoe@example.com", "John Doe"),
                NewUser::new("asmith", "asmith@example.com", "Alice Smith"),
            ],
        )
        .unwrap();
    let members = client.get_domain_users(DOMAIN_ID).unwrap();
    let usernames: Vec<&str> = members.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(usernames, vec!["asmith", "jdoe"]);

    // Step 13: delete the user.
    client.delete_user(&created.id).unwrap();
    let err = client.get_user(&created.id).unwrap_err();
    assert!(matches!(err, Error::Api(_)));
    assert_eq!(api_code(&err), "api.error.notfound.user");
}

#[test]
fn bypass_codes_lifecycle() {
    let (addr, _db) = start_server();
    let client = client_for(addr, API_KEY);
    let user = client
        .create_user(&NewUser::new("bypass", "bypass@example.com", "Bypass User"))
        .unwrap();

    let first = client
        .create_user_bypass_code(
            &user.id,
            &NewBypassCode {
                uses_allowed: 3,
                expiration_time: 7,
            },
        )
        .unwrap();
    assert_eq!(first.user, user.id);
    assert_eq!(first.code.len(), 9);
    assert!(first.code.chars().all(|c| c.is_ascii_digit()), "{}", first.code);
    assert_eq!(first.uses_allowed, 3);
    assert_eq!(first.uses_remaining, 3);

    let second = client
        .create_user_bypass_code(&user.id, &NewBypassCode::default())
        .unwrap();
    assert_eq!(second.uses_allowed, 1);

    assert_eq!(client.get_bypass_code(&first.id).unwrap(), first);
    assert_eq!(
        client.get_user_bypass_codes(&user.id).unwrap(),
        vec![first.clone(), second.clone()]
    );
    assert_eq!(
        client.get_user(&user.id).unwrap().bypasscodes,
        vec![first.id.clone(), second.id.clone()]
    );

    let err = client
        .create_user_bypass_code(
            &user.id,
            &NewBypassCode {
                uses_allowed: 0,
                expiration_time: 0,
            },
        )
        .unwrap_err();
    assert_eq!(api_code(&err), "api.error.badrequest");

    client.delete_bypass_code(&first.id).unwrap();
    let err = client.get_bypass_code(&first.id).unwrap_err();
    assert_eq!(api_code(&err), "api.error.notfound.bypasscode");
    assert_eq!(client.get_user_bypass_codes(&user.id).unwrap(), vec![second]);

    client.delete_user_bypass_codes(&user.id).unwrap();
    assert!(client.get_user_bypass_codes(&user.id).unwrap().is_empty());
    assert!(client.get_user(&user.id).unwrap().bypasscodes.is_empty());
}

#[test]
fn hardware_token_lifecycle() {
    let (addr, _db) = start_server();
    let client = client_for(addr, API_KEY);
    let user = client
        .create_user(&NewUser::new("hwuser", "hwuser@example.com", "Hardware User"))
        .unwrap();
    let new_token = NewHardwareToken {
        alias: Some("desk".to_string()),
        serial_number: "1234567".to_string(),
        kind: "TOTP6".to_string(),
        time_step: 30,
        seed: "3132333435363738393031323334353637383930".to_string(),
    };

    let token = client.create_hardware_token(&new_token).unwrap();
    assert_eq!(token.serial_number, "1234567");
    assert_eq!(token.kind, "TOTP6");
    assert_eq!(token.time_step, "30");
    assert_eq!(token.user, None);

    let err = client.create_hardware_token(&new_token).unwrap_err();
    assert_eq!(api_code(&err), "api.error.conflict.hardware");

    assert_eq!(client.get_hardware_token(&token.id).unwrap(), token);
    assert_eq!(client.get_hardware_tokens(1).unwrap(), vec![token.clone()]);
    assert!(client.get_hardware_tokens(2).unwrap().is_empty());

    let renamed = client.update_hardware_token(&token.id, "laptop").unwrap();
    assert_eq!(renamed.alias.as_deref(), Some("laptop"));

    let err = client.get_user_hardware_token(&user.id).unwrap_err();
    assert_eq!(api_code(&err), "api.error.notfound.hardware");

    client.associate_hardware_token(&user.id, &token.id).unwrap();
    let held = client.get_user_hardware_token(&user.id).unwrap();
    assert_eq!(held.id, token.id);
    assert_eq!(held.user.as_deref(), Some(user.id.as_str()));
    assert_eq!(client.get_user(&user.id).unwrap().hardware.as_deref(), Some(token.id.as_str()));

    let other = client
        .create_user(&NewUser::new("other", "other@example.com", "Other"))
        .unwrap();
    let err = client.associate_hardware_token(&other.id, &token.id).unwrap_err();
    assert_eq!(api_code(&err), "api.error.conflict.hardware");

    client.disassociate_hardware_token(&user.id).unwrap();
    assert_eq!(client.get_user(&user.id).unwrap().hardware, None);
    assert_eq!(client.get_hardware_token(&token.id).unwrap().user, None);

    client.delete_hardware_token(&token.id).unwrap();
    let err = client.get_hardware_token(&token.id).unwrap_err();
    assert_eq!(api_code(&err), "api.error.notfound.hardware");
}

#[test]
fn transport_returns_response_headers() {
    let (addr, _db) = start_server();
    let client = client_for(addr, API_KEY);
    let rest = client.rest();

    let ping = rest
        .transport()
        .execute(&rest.build_get("/api/ping", None).unwrap())
        .unwrap();
    assert_eq!(ping.status, 200);
    assert_eq!(ping.header("content-type"), Some(MEDIA_TYPE));

    let image = rest
        .transport()
        .execute(
            &rest
                .build_get_bytes(&format!("/api/domains/{DOMAIN_ID}/image"), "image/png")
                .unwrap(),
        )
        .unwrap();
    assert_eq!(image.header("Content-Type"), Some("image/png"));
    assert_eq!(image.body, DOMAIN_IMAGE.to_vec());

    // Failures come back as data too.
    let missing = rest
        .transport()
        .execute(&rest.build_get("/api/users/nope", None).unwrap())
        .unwrap();
    assert_eq!(missing.status, 404);
    assert_eq!(missing.header("Content-Type"), Some(MEDIA_TYPE));
}

#[test]
fn wrong_api_key_is_an_api_error() {
    let (addr, _db) = start_server();
    let client = client_for(addr, "not-the-key");

    let err = client.ping().unwrap_err();
    assert_eq!(api_code(&err), "api.error.unauthorized");
}

#[test]
fn unreachable_server_is_internal() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(addr, API_KEY);

    let err = client.ping().unwrap_err();
    assert!(err.api_error().is_none());
    assert!(
        matches!(err, Error::Internal(InternalError::Transport(TransportError::Http(_)))),
        "{err:?}"
    );
}
