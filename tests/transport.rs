mod common;

use besapi::{
    ApiVersion, Attachment, Client, ClientConfig, Credentials, Encoding, Endpoint, Error, NewUser, Params,
    create_api_user,
};
use common::{TOKEN, api_root, start, token_query};
use mockito::{Matcher, Server};
use serde_json::{Value, json};

fn params(v: Value) -> Params {
    v.as_object().cloned().unwrap()
}

#[test]
fn get_sends_token_and_params_in_query() {
    let (mut server, client) = start();
    let m = server
        .mock("GET", "/api/v1/buildings/12")
        .match_query(Matcher::AllOf(vec![
            token_query(),
            Matcher::UrlEncoded("detail".into(), "full".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"id": 12}"#)
        .create();

    let endpoint = Endpoint::new("buildings").id(12).version(ApiVersion::V1);
    let response = client.get(&endpoint, params(json!({"detail": "full"}))).unwrap();

    m.assert();
    assert!(response.is_success());
    assert_eq!(response.json::<Value>().unwrap(), json!({"id": 12}));
}

#[test]
fn post_sends_token_in_json_body() {
    let (mut server, client) = start();
    let m = server
        .mock("POST", "/api/v2/preview_buildings")
        .match_body(Matcher::Json(json!({"name": "HQ", "token": TOKEN})))
        .with_status(201)
        .with_body(r#"{"id": 3}"#)
        .create();

    let response = client
        .post(&Endpoint::new("preview_buildings"), params(json!({"name": "HQ"})), &[])
        .unwrap();

    m.assert();
    assert_eq!(response.status, 201);
}

#[test]
fn put_can_encode_as_query() {
    let (mut server, client) = start();
    let m = server
        .mock("PUT", "/api/v2/users/4")
        .match_query(Matcher::AllOf(vec![
            token_query(),
            Matcher::UrlEncoded("first_name".into(), "Ada".into()),
        ]))
        .with_status(200)
        .create();

    client
        .put(
            &Endpoint::new("users").id(4),
            params(json!({"first_name": "Ada"})),
            Encoding::Query,
            &[],
        )
        .unwrap();
    m.assert();
}

#[test]
fn delete_and_non_success_status_are_returned_as_is() {
    let (mut server, client) = start();
    let m = server
        .mock("DELETE", "/api/v2/preview_buildings/9")
        .match_query(token_query())
        .with_status(404)
        .with_body("<!DOCTYPE html><html>missing</html>")
        .create();

    let response = client
        .delete(&Endpoint::new("preview_buildings").id(9), Params::new())
        .unwrap();
    m.assert();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[test]
fn action_without_id_never_reaches_the_network() {
    let (mut server, client) = start();
    let m = server.mock("GET", Matcher::Any).expect(0).create();

    let err = client
        .get(&Endpoint::new("buildings").action("simulate"), Params::new())
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "id must be supplied with action");
    m.assert();
}

#[test]
fn credentials_are_exchanged_for_a_token() {
    let mut server = Server::new();
    let auth = server
        .mock("POST", "/api/v2/users/authenticate")
        .match_body(Matcher::Json(json!({
            "email": "a@example.com",
            "password": "Ssh!1ts@secret",
            "organization_token": "org",
            "password_confirmation": "Ssh!1ts@secret",
        })))
        .with_status(200)
        .with_body(r#"{"user_id": 9, "token": "fresh"}"#)
        .create();
    let list = server
        .mock("GET", "/api/v2/preview_buildings")
        .match_query(Matcher::UrlEncoded("token".into(), "fresh".into()))
        .with_status(200)
        .with_body("[]")
        .create();

    let client = Client::new(ClientConfig {
        url: api_root(&server),
        credentials: Some(Credentials {
            email: "a@example.com".into(),
            password: "Ssh!1ts@secret".into(),
            organization_token: "org".into(),
        }),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(client.token(), Some("fresh"));
    assert_eq!(client.user_id(), Some(9));
    assert_eq!(client.current().list_preview_buildings().unwrap(), json!([]));
    auth.assert();
    list.assert();
}

#[test]
fn failed_authentication_reports_the_api_error() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/v2/users/authenticate")
        .with_status(401)
        .with_body(r#"{"error": "Invalid email or password"}"#)
        .create();

    let err = Client::new(ClientConfig {
        url: api_root(&server),
        credentials: Some(Credentials {
            email: "a@example.com".into(),
            password: "wrong".into(),
            organization_token: "org".into(),
        }),
        ..Default::default()
    })
    .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(
        err.to_string(),
        "Unable to obtain access token: 401 Invalid email or password"
    );
}

#[test]
fn create_api_user_needs_no_token() {
    let mut server = Server::new();
    let m = server
        .mock("POST", "/api/v2/users")
        .match_body(Matcher::Json(json!({
            "organization_token": "org",
            "email": "new@example.com",
            "password": "Ssh!1ts@secret",
            "password_confirmation": "Ssh!1ts@secret",
        })))
        .with_status(201)
        .with_body(r#"{"id": 11, "organization_id": 2, "role_id": 3, "email": "new@example.com"}"#)
        .create();

    let user = NewUser {
        organization_token: "org".into(),
        email: "new@example.com".into(),
        password: "Ssh!1ts@secret".into(),
        password_confirmation: "Ssh!1ts@secret".into(),
        first_name: None,
        last_name: None,
    };
    let config = ClientConfig {
        url: api_root(&server),
        token: Some("ignored".into()),
        ..Default::default()
    };

    assert_eq!(create_api_user(config, &user).unwrap(), (11, 2, 3));
    m.assert();
}

fn floor_plan() -> Attachment {
    Attachment {
        field: "file".into(),
        file_name: "plan.csv".into(),
        content: b"id,name\n1,HQ\n".to_vec(),
        mime: Some("text/csv".into()),
    }
}

#[test]
fn attachments_go_out_as_multipart_parts() {
    let (mut server, client) = start();
    let m = server
        .mock("POST", "/api/v1/buildings/5/import")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(format!(r#"name="token"\r\n\r\n{TOKEN}"#)),
            Matcher::Regex(r#"name="note"\r\n\r\nfirst floor"#.into()),
            Matcher::Regex(r#"name="file"; filename="plan.csv""#.into()),
            Matcher::Regex("(?i)content-type: text/csv".into()),
            Matcher::Regex("id,name\n1,HQ".into()),
        ]))
        .with_status(201)
        .with_body("{}")
        .create();

    let endpoint = Endpoint::new("buildings")
        .id(5)
        .action("import")
        .version(ApiVersion::V1);
    let response = client
        .post(&endpoint, params(json!({"note": "first floor"})), &[floor_plan()])
        .unwrap();

    m.assert();
    assert_eq!(response.status, 201);
}

#[test]
fn put_with_attachments_uses_multipart() {
    let (mut server, client) = start();
    let m = server
        .mock("PUT", "/api/v2/users/4")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::Regex(r#"name="file"; filename="plan.csv""#.into()))
        .with_status(200)
        .create();

    client
        .put(
            &Endpoint::new("users").id(4),
            Params::new(),
            Encoding::Json,
            &[floor_plan()],
        )
        .unwrap();
    m.assert();
}

#[test]
fn attachments_are_rejected_with_query_encoding() {
    let (mut server, client) = start();
    let m = server.mock("PUT", Matcher::Any).expect(0).create();

    let err = client
        .put(
            &Endpoint::new("users").id(4),
            Params::new(),
            Encoding::Query,
            &[floor_plan()],
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "attachments cannot be sent with query encoding");
    m.assert();
}
