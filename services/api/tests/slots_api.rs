//! End-to-end tests of the REST routes, driven through the router without a socket.

use api_lib::{
    adapters::MemoryRepository,
    config::Config,
    web::{
        middleware::{USER_ID_HEADER, USER_NAME_HEADER},
        router,
        state::AppState,
    },
};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use timetable_core::{Period, TimetableDocument};
use tower::ServiceExt;
use uuid::Uuid;

const EDITOR: &str = "6f1c2a0e-3b7d-4c1e-9a55-0d2f4b8e7c11";

fn app() -> (Router, Uuid) {
    let document = TimetableDocument::new(
        "Spring term",
        vec![Period::new("1", "First period"), Period::new("2", "Second period")],
    );
    let id = document.id;
    let repo = Arc::new(MemoryRepository::with_documents([document]));
    let state = Arc::new(AppState::new(repo, Arc::new(Config::default())));
    (router(state), id)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, EDITOR)
        .header(USER_NAME_HEADER, "Ms Keller");
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn slot(day: &str, period: &str, teacher: &str, class: &str, room: &str) -> Value {
    json!({
        "day": day,
        "periodId": period,
        "subjectId": "math",
        "teacherId": teacher,
        "roomId": room,
        "classId": class
    })
}

#[tokio::test]
async fn insert_into_free_cell_is_created() {
    let (app, id) = app();
    let uri = format!("/timetables/{id}/slots");

    let (status, body) = call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c1", "r1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["teacherId"], "t1");
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));

    let (status, body) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn teacher_clash_is_rejected_with_its_conflict() {
    let (app, id) = app();
    let uri = format!("/timetables/{id}/slots");
    call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c1", "r1"))).await;

    let (status, body) = call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c2", "r2"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let conflicts = body["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["kind"], "teacher");
    assert_eq!(body["candidate"]["classId"], "c2");

    let (_, listed) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn class_and_room_clash_reports_both() {
    let (app, id) = app();
    let uri = format!("/timetables/{id}/slots");
    call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c1", "r1"))).await;

    let (status, body) = call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t2", "c1", "r1"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let kinds: Vec<_> = body["conflicts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["class", "room"]);
}

#[tokio::test]
async fn replace_swaps_the_clashing_slot_for_the_candidate() {
    let (app, id) = app();
    let uri = format!("/timetables/{id}/slots");
    call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c1", "r1"))).await;
    call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c2", "r2"))).await;

    let (status, state) = call(&app, Method::GET, &format!("/timetables/{id}/resolution"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["state"], "pending_conflict");

    let (status, committed) =
        call(&app, Method::POST, &format!("/timetables/{id}/resolution/replace"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(committed["classId"], "c2");

    let (_, listed) = call(&app, Method::GET, &uri, None).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["classId"], "c2");

    let (status, _) = call(&app, Method::POST, &format!("/timetables/{id}/resolution/replace"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reschedule_returns_the_candidate_as_a_form() {
    let (app, id) = app();
    let uri = format!("/timetables/{id}/slots");
    call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c1", "r1"))).await;
    call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c2", "r2"))).await;

    let (status, body) =
        call(&app, Method::POST, &format!("/timetables/{id}/resolution/reschedule"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draft"]["day"], "Monday");
    assert_eq!(body["draft"]["classId"], "c2");

    let (_, state) = call(&app, Method::GET, &format!("/timetables/{id}/resolution"), None).await;
    assert_eq!(state["state"], "idle");
}

#[tokio::test]
async fn missing_fields_are_unprocessable() {
    let (app, id) = app();
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/timetables/{id}/slots"),
        Some(json!({ "day": "Monday", "periodId": "1", "subjectId": "math" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<_> = body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["teacherId", "roomId", "classId"]);
}

#[tokio::test]
async fn unknown_period_is_unprocessable() {
    let (app, id) = app();
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/timetables/{id}/slots"),
        Some(slot("Monday", "9", "t1", "c1", "r1")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn removing_twice_succeeds_both_times() {
    let (app, id) = app();
    let (_, created) = call(
        &app,
        Method::POST,
        &format!("/timetables/{id}/slots"),
        Some(slot("Monday", "1", "t1", "c1", "r1")),
    )
    .await;
    let slot_uri = format!("/timetables/{id}/slots/{}", created["id"].as_str().unwrap());

    let (status, _) = call(&app, Method::DELETE, &slot_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, &slot_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn cell_lookup_finds_the_class_slot() {
    let (app, id) = app();
    let uri = format!("/timetables/{id}/slots");
    call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t1", "c1", "r1"))).await;
    call(&app, Method::POST, &uri, Some(slot("Monday", "1", "t2", "c2", "r2"))).await;

    let (status, body) = call(&app, Method::GET, &format!("{uri}?day=Monday&periodId=1&classId=c2"), None).await;
    assert_eq!(status, StatusCode::OK);
    let cells = body.as_array().unwrap();
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0]["teacherId"], "t2");

    let (_, body) = call(&app, Method::GET, &format!("{uri}?day=Tuesday&periodId=1&classId=c2"), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn moving_a_slot_onto_its_own_cell_is_allowed() {
    let (app, id) = app();
    let (_, created) = call(
        &app,
        Method::POST,
        &format!("/timetables/{id}/slots"),
        Some(slot("Monday", "1", "t1", "c1", "r1")),
    )
    .await;
    let slot_id = created["id"].as_str().unwrap();

    let mut changed = slot("Monday", "1", "t1", "c1", "r1");
    changed["subjectId"] = json!("physics");
    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/timetables/{id}/slots/{slot_id}"),
        Some(changed),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subjectId"], "physics");
    assert_eq!(body["id"], slot_id);
}

#[tokio::test]
async fn requests_without_an_editor_are_unauthorized() {
    let (app, id) = app();
    let request = Request::builder()
        .uri(format!("/timetables/{id}/slots"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_timetable_is_not_found() {
    let (app, _) = app();
    let (status, body) = call(&app, Method::GET, &format!("/timetables/{}/slots", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn export_then_import_keeps_the_slots() {
    let (app, id) = app();
    call(
        &app,
        Method::POST,
        &format!("/timetables/{id}/slots"),
        Some(slot("Monday", "1", "t1", "c1", "r1")),
    )
    .await;

    let (status, exported) = call(&app, Method::GET, &format!("/timetables/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exported["slots"].as_array().map(Vec::len), Some(1));

    let (fresh, _) = self::app();
    let (status, summary) = call(&fresh, Method::POST, "/timetables/import", Some(exported)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(summary["slotCount"], 1);
    assert_eq!(summary["id"], id.to_string());
}

#[tokio::test]
async fn import_of_clashing_document_is_rejected() {
    let (app, _) = app();
    let now = "2026-01-05T08:00:00Z";
    let document = json!({
        "id": Uuid::new_v4(),
        "name": "Broken",
        "periods": [],
        "slots": [
            { "id": "a", "day": "Monday", "periodId": "1", "subjectId": "s", "teacherId": "t1", "roomId": "r1", "classId": "c1" },
            { "id": "b", "day": "Monday", "periodId": "1", "subjectId": "s", "teacherId": "t1", "roomId": "r2", "classId": "c2" }
        ],
        "createdAt": now,
        "updatedAt": now
    });
    let (status, _) = call(&app, Method::POST, "/timetables/import", Some(document)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn created_timetable_is_listed_and_deletable() {
    let (app, _) = app();
    let (status, created) = call(
        &app,
        Method::POST,
        "/timetables",
        Some(json!({ "name": "Autumn term", "periods": [{ "id": "1", "label": "First" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let new_id = created["id"].as_str().unwrap().to_string();

    let (_, listed) = call(&app, Method::GET, "/timetables", None).await;
    let names: Vec<_> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Autumn term", "Spring term"]);

    let (status, _) = call(&app, Method::DELETE, &format!("/timetables/{new_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, &format!("/timetables/{new_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
