//! Verify request building and error classification against JSON test
//! vectors stored in `test-vectors/`.
//!
//! `requests.json` pins the exact URL, header order and body of requests
//! built for a given configuration. `errors.json` pins how failed responses
//! classify. Bodies are compared as parsed JSON, not raw strings, so field
//! order does not matter.

use logintc_core::{
    AdminRestClient, ClientConfig, Error, HttpMethod, HttpRequest, InternalError, TransportError, UreqTransport,
};
use serde_json::Value;

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn client_for(config: &Value) -> AdminRestClient {
    let config = ClientConfig::new(config["api_key"].as_str().unwrap())
        .with_host(config["host"].as_str().unwrap())
        .unwrap()
        .with_secure(config["secure"].as_bool().unwrap())
        .with_user_agent(config["user_agent"].as_str().unwrap());
    AdminRestClient::from_config(&config, UreqTransport::new())
}

fn build(client: &AdminRestClient, request: &Value) -> HttpRequest {
    let path = request["path"].as_str().unwrap();
    let body = request
        .get("body")
        .map(|b| serde_json::to_vec(b).unwrap());
    let built = match parse_method(request["method"].as_str().unwrap()) {
        HttpMethod::Get => match request["accept"].as_str() {
            Some(accept) => client.build_get_bytes(path, accept),
            None => client.build_get(path, request["query"].as_str()),
        },
        HttpMethod::Post => client.build_post(path, body),
        HttpMethod::Put => client.build_put(path, body),
        HttpMethod::Delete => client.build_delete(path),
    };
    built.unwrap()
}

fn expected_headers(expected: &Value) -> Vec<(String, String)> {
    expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let pair = h.as_array().unwrap();
            (pair[0].as_str().unwrap().to_string(), pair[1].as_str().unwrap().to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let client = client_for(&case["config"]);
        let req = build(&client, &case["request"]);
        let expected = &case["expected"];

        assert_eq!(
            req.method,
            parse_method(case["request"]["method"].as_str().unwrap()),
            "{name}: method"
        );
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.headers, expected_headers(expected), "{name}: headers");

        match &expected["body"] {
            Value::Null => assert_eq!(req.body, None, "{name}: body"),
            body => {
                let sent: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&sent, body, "{name}: body");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let body = case["body"].as_str().unwrap();
        let expected = &case["expected"];

        // Route through the same conversion the client uses.
        let err = Error::from(TransportError::Status {
            status,
            body: body.to_string(),
        });

        match expected["kind"].as_str().unwrap() {
            "no_token" => assert!(matches!(err, Error::NoToken(_)), "{name}: {err:?}"),
            "api" => assert!(matches!(err, Error::Api(_)), "{name}: {err:?}"),
            "internal" => {
                match &err {
                    Error::Internal(InternalError::Transport(TransportError::Status {
                        status: got_status,
                        body: got_body,
                    })) => {
                        assert_eq!(u64::from(*got_status), expected["status"].as_u64().unwrap(), "{name}: status");
                        assert_eq!(got_body, body, "{name}: body preserved");
                    }
                    other => panic!("{name}: expected internal status error, got {other:?}"),
                }
                continue;
            }
            other => panic!("unknown kind: {other}"),
        }

        let api = err.api_error().unwrap();
        assert_eq!(api.code, expected["code"].as_str().unwrap(), "{name}: code");
        assert_eq!(api.message, expected["message"].as_str().unwrap(), "{name}: message");
    }
}
