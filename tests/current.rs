mod common;

use besapi::property::create_preview_building_from_property;
use besapi::{NewPreviewBuilding, PreviewReport, UserUpdate};
use common::{TOKEN, json_call, json_get, start};
use mockito::Matcher;
use serde_json::json;

fn preview() -> NewPreviewBuilding {
    NewPreviewBuilding {
        building_name: "Test".into(),
        year_completed: "2000".into(),
        floor_area: 12000.0,
        street: "1 Main St".into(),
        city: "Richland".into(),
        state: "WA".into(),
        postal_code: "99352".into(),
        assessment_type: "Real".into(),
        use_type: "Office".into(),
        orientation: "North/South".into(),
        number_floors: 2,
    }
}

#[test]
fn create_preview_building_wraps_payload() {
    let (mut server, client) = start();
    let m = server
        .mock("POST", "/api/v2/preview_buildings")
        .match_body(Matcher::PartialJson(json!({
            "building": {"building_name": "Test", "number_floors": 2, "use_type": "Office"},
            "token": TOKEN,
        })))
        .with_status(201)
        .with_body(r#"{"building_id": 55}"#)
        .create();

    let created = client.current().create_preview_building(&preview()).unwrap();
    assert_eq!(created["building_id"], 55);
    m.assert();
}

#[test]
fn preview_report_variants_hit_their_actions() {
    let (mut server, client) = start();
    let plain = json_get(&mut server, "/api/v2/preview_buildings/5", r#"{"building_id": 5}"#);
    let report = json_get(
        &mut server,
        "/api/v2/preview_buildings/5/report",
        r#"{"pdf_url": "https://x/5.pdf"}"#,
    );
    let simple = json_get(&mut server, "/api/v2/preview_buildings/5/simple", r#"{"score": 7}"#);

    let current = client.current();
    assert_eq!(current.get_preview_building(5, None).unwrap()["building_id"], 5);
    assert_eq!(
        current.get_preview_building(5, Some(PreviewReport::Pdf)).unwrap()["pdf_url"],
        "https://x/5.pdf"
    );
    assert_eq!(
        current
            .get_preview_building(5, Some("simple".parse().unwrap()))
            .unwrap()["score"],
        7
    );
    plain.assert();
    report.assert();
    simple.assert();
}

#[test]
fn building_actions_are_gets() {
    let (mut server, client) = start();
    let dup = json_get(&mut server, "/api/v2/preview_buildings/5/duplicate", r#"{"building_id": 6}"#);
    let sim = json_get(&mut server, "/api/v2/preview_buildings/5/simulate", "{}");
    let val = json_get(&mut server, "/api/v2/preview_buildings/5/validate", "{}");

    let current = client.current();
    assert_eq!(current.duplicate_preview_building(5).unwrap()["building_id"], 6);
    current.simulate_preview_building(5).unwrap();
    current.validate_preview_building(5).unwrap();
    dup.assert();
    sim.assert();
    val.assert();
}

#[test]
fn update_preview_building_carries_block_id() {
    let (mut server, client) = start();
    let m = server
        .mock("PUT", "/api/v2/preview_buildings/5")
        .match_body(Matcher::PartialJson(json!({
            "building": {"block_id": 9, "building_name": "Renamed"},
        })))
        .with_status(200)
        .with_body("{}")
        .create();

    client
        .current()
        .update_preview_building(5, 9, &json!({"building_name": "Renamed", "block_id": 1}))
        .unwrap();
    m.assert();
}

#[test]
fn update_user_checks_passwords_locally() {
    let (mut server, client) = start();
    let m = server.mock("PUT", Matcher::Any).expect(0).create();

    let only_one = UserUpdate {
        password: Some("Ssh!1ts@secret".into()),
        ..Default::default()
    };
    let err = client.current().update_user(3, &only_one).unwrap_err();
    assert_eq!(err.to_string(), "Password and password_confirmation must be supplied");

    let mismatch = UserUpdate {
        password: Some("Ssh!1ts@secret".into()),
        password_confirmation: Some("Ssh!1ts@secreT".into()),
        ..Default::default()
    };
    let err = client.current().update_user(3, &mismatch).unwrap_err();
    assert_eq!(err.to_string(), "Passwords do not match!");
    m.assert();
}

#[test]
fn update_user_sends_only_given_fields() {
    let (mut server, client) = start();
    let m = server
        .mock("PUT", "/api/v2/users/3")
        .match_body(Matcher::Json(json!({"first_name": "Ada", "token": TOKEN})))
        .with_status(200)
        .with_body("{}")
        .create();

    let update = UserUpdate {
        first_name: Some("Ada".into()),
        ..Default::default()
    };
    client.current().update_user(3, &update).unwrap();
    m.assert();
}

#[test]
fn preview_building_from_property_record() {
    let (mut server, client) = start();
    let m = json_call(&mut server, "POST", "/api/v2/preview_buildings", r#"{"building_id": 77}"#);
    let property = json!({
        "state": {
            "property_name": "Old Mill",
            "year_built": 1850,
            "gross_floor_area": 5000.0,
            "address_line_1": "2 Mill Rd",
            "address_line_2": null,
            "city": "Richland",
            "state": "WA",
            "postal_code": "99352",
            "property_type": "Office",
            "extra_data": {"number_floors": 3},
        }
    });

    let created = create_preview_building_from_property(&client.current(), &property).unwrap();
    assert_eq!(created["building_id"], 77);
    m.assert();

    let err = create_preview_building_from_property(&client.current(), &json!({"state": {}}))
        .unwrap_err();
    assert!(err.to_string().starts_with("One or more required values are Null: "));
}
