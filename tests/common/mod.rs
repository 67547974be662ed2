//! Shared mockito fixtures.

#![allow(dead_code)]

use besapi::Client;
use mockito::{Matcher, Mock, Server, ServerGuard};

pub const TOKEN: &str = "ssh-secret-token";

/// A mock server and a token-authenticated client pointed at its `/api` root.
pub fn start() -> (ServerGuard, Client) {
    let server = Server::new();
    let client = Client::with_token(api_root(&server), TOKEN).unwrap();
    (server, client)
}

pub fn api_root(server: &ServerGuard) -> String {
    format!("{}/api", server.url())
}

pub fn token_query() -> Matcher {
    Matcher::UrlEncoded("token".into(), TOKEN.into())
}

/// `GET path?token=...` answering `body` as JSON.
pub fn json_get(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
    server
        .mock("GET", path)
        .match_query(token_query())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

/// `method path` with the token in a JSON body, answering `body` as JSON.
pub fn json_call(server: &mut ServerGuard, method: &str, path: &str, body: &str) -> Mock {
    server
        .mock(method, path)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(serde_json::json!({ "token": TOKEN })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}
