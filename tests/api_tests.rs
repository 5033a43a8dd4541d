// tests/api_tests.rs

use std::sync::Arc;

use axum::{body::Body, http::Request};
use eduexam::{
    config::Config,
    routes,
    state::{AppState, seed_teacher},
    store::LocalStore,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "test_secret_for_integration_tests";

async fn test_state() -> AppState {
    let config = Config::for_tests(SECRET);
    let store = Arc::new(LocalStore::in_memory());
    seed_teacher(store.as_ref(), &config)
        .await
        .expect("Failed to seed teacher");
    AppState::new(store, config, None)
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let app = routes::create_router(test_state().await);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn login(client: &reqwest::Client, address: &str, role: &str, identifier: &str, password: &str) -> String {
    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "role": role, "identifier": identifier, "password": password }))
        .send()
        .await
        .expect("Login failed");
    assert_eq!(resp.status().as_u16(), 200, "login as {identifier} failed");
    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().expect("Token not found").to_string()
}

async fn teacher_token(client: &reqwest::Client, address: &str) -> String {
    login(client, address, "TEACHER", "admin", "admin123").await
}

fn exam_body(title: &str, classes: &[&str]) -> Value {
    json!({
        "title": title,
        "passPercentage": 60,
        "targetClasses": classes,
        "questions": [
            { "text": "2 + 2 = ?", "options": ["3", "4", "5", "6"], "correctAnswerIndex": 1 },
            { "text": "3 x 3 = ?", "options": ["9", "6", "12", "33"], "correctAnswerIndex": 0 },
            { "text": "10 / 2 = ?", "options": ["2", "4", "5", "8"], "correctAnswerIndex": 2 }
        ]
    })
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = routes::create_router(test_state().await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/students")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn teacher_login_and_me() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let bad = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "role": "TEACHER", "identifier": "admin", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 401);

    let token = teacher_token(&client, &address).await;
    let me: Value = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "TEACHER");
    assert_eq!(me["username"], "admin");
    assert!(me.get("passwordHash").is_none());
}

#[tokio::test]
async fn logout_revokes_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = teacher_token(&client, &address).await;

    let resp = client
        .post(format!("{}/api/auth/logout", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn student_roster_crud_and_login() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = teacher_token(&client, &address).await;

    let resp = client
        .post(format!("{}/api/students", address))
        .bearer_auth(&token)
        .json(&json!({ "schoolNo": "1001", "name": "Ali", "surname": "Kaya", "classGroup": "5a" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["classGroup"], "5A");

    // Same school number updates in place.
    let resp = client
        .post(format!("{}/api/students", address))
        .bearer_auth(&token)
        .json(&json!({ "schoolNo": "1001", "name": "Ali", "surname": "Demir", "classGroup": "5A" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["id"], created["id"]);

    let students: Vec<Value> = client
        .get(format!("{}/api/students", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["surname"], "Demir");

    // Default password is the school number.
    let student_token = login(&client, &address, "STUDENT", "1001", "1001").await;

    // Students cannot reach teacher routes.
    let resp = client
        .get(format!("{}/api/students", address))
        .bearer_auth(&student_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = client
        .delete(format!("{}/api/students/1001", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "role": "STUDENT", "identifier": "1001", "password": "1001" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn csv_import_skips_malformed_rows() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = teacher_token(&client, &address).await;

    let csv = "No,Ad,Soyad,Sinif\n101,Ali,Yilmaz,5A\n102,Ayse\n103;Veli;Demir;6b;gizli\n";
    let resp = client
        .post(format!("{}/api/students/import", address))
        .bearer_auth(&token)
        .header("content-type", "text/csv")
        .body(csv)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["imported"], 2);
    assert_eq!(report["skipped"].as_array().unwrap().len(), 2);

    let classes: Vec<String> = client
        .get(format!("{}/api/students/classes", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(classes, vec!["5A".to_string(), "6B".to_string()]);

    login(&client, &address, "STUDENT", "101", "101").await;
    login(&client, &address, "STUDENT", "103", "gizli").await;
}

#[tokio::test]
async fn exam_save_validates_and_updates_in_place() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = teacher_token(&client, &address).await;

    let mut three_options = exam_body("Bad", &["5A"]);
    three_options["questions"][0]["options"] = json!(["a", "b", "c"]);
    for body in [
        three_options,
        exam_body("No classes", &[]),
        exam_body("", &["5A"]),
        json!({ "title": "Empty", "targetClasses": ["5A"], "questions": [] }),
    ] {
        let resp = client
            .post(format!("{}/api/exams", address))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "accepted {body}");
    }

    let resp = client
        .post(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .json(&exam_body("Matematik", &["5A"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let exam: Value = resp.json().await.unwrap();
    assert_eq!(exam["durationMinutes"], 6);
    assert_eq!(exam["difficultyPoints"], 100);
    assert_eq!(exam["status"], "ACTIVE");

    let mut edit = exam_body("Matematik 2", &["5A", "5B"]);
    edit["id"] = exam["id"].clone();
    edit["durationMinutes"] = json!(99);
    edit["questions"].as_array_mut().unwrap().pop();
    let resp = client
        .post(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .json(&edit)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["durationMinutes"], 4);

    let list: Vec<Value> = client
        .get(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "Matematik 2");
    assert_eq!(list[0]["questionCount"], 2);

    let pool: Vec<Value> = client
        .get(format!("{}/api/exams/pool", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pool.len(), 3);

    let id = exam["id"].as_str().unwrap();
    let resp = client
        .put(format!("{}/api/exams/{}/status", address, id))
        .bearer_auth(&token)
        .json(&json!({ "status": "ARCHIVED" }))
        .send()
        .await
        .unwrap();
    let archived: Value = resp.json().await.unwrap();
    assert_eq!(archived["status"], "ARCHIVED");

    let resp = client
        .delete(format!("{}/api/exams/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    let resp = client
        .get(format!("{}/api/exams/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn share_link_round_trip() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = teacher_token(&client, &address).await;

    let exam: Value = client
        .post(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .json(&exam_body("Paylasilan", &["5A"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = exam["id"].as_str().unwrap();

    let share: Value = client
        .get(format!("{}/api/exams/{}/share", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let link = url::Url::parse(share["link"].as_str().unwrap()).unwrap();
    let payload = link
        .query_pairs()
        .find(|(k, _)| k == "importExam")
        .map(|(_, v)| v.into_owned())
        .expect("link carries the exam");

    client
        .delete(format!("{}/api/exams/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    // Undecodable payload: nothing is imported.
    let resp = client
        .post(format!("{}/api/exams/import", address))
        .bearer_auth(&token)
        .json(&json!({ "payload": "this is not a share link" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client
        .post(format!("{}/api/exams/import", address))
        .bearer_auth(&token)
        .json(&json!({ "payload": payload }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "Paylasilan");

    let imported: Value = client
        .get(format!("{}/api/exams/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(imported["questions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn malformed_shared_exam_is_not_imported() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = teacher_token(&client, &address).await;

    let exam: eduexam::models::exam::Exam = serde_json::from_value(json!({
        "id": "broken",
        "title": "Bad",
        "durationMinutes": 999,
        "targetClasses": [],
        "questions": [
            { "id": "q1", "text": "?", "options": ["a", "b"], "correctAnswerIndex": 200 }
        ]
    }))
    .unwrap();
    let payload = eduexam::share::encode_exam(&exam).unwrap();

    let resp = client
        .post(format!("{}/api/exams/import", address))
        .bearer_auth(&token)
        .json(&json!({ "payload": payload }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client
        .get(format!("{}/api/exams/broken", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let pool: Value = client
        .get(format!("{}/api/exams/pool", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(pool.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn share_link_query_is_stripped_by_redirect() {
    let address = spawn_app().await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let token = teacher_token(&client, &address).await;

    let exam: eduexam::models::exam::Exam = serde_json::from_value(json!({
        "id": "shared-1",
        "title": "Linkten Gelen",
        "targetClasses": ["7C"],
        "questions": [
            { "id": "q1", "text": "?", "options": ["a", "b", "c", "d"], "correctAnswerIndex": 0 }
        ]
    }))
    .unwrap();
    let payload = eduexam::share::encode_exam(&exam).unwrap();

    let mut url = url::Url::parse(&format!("{}/api/exams/import", address)).unwrap();
    url.query_pairs_mut()
        .append_pair("tab", "exams")
        .append_pair("importExam", &payload);

    let resp = client.get(url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 303);
    assert_eq!(
        resp.headers()["location"].to_str().unwrap(),
        "/api/exams/import?tab=exams"
    );

    let resp = client
        .get(format!("{}/api/exams/shared-1", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn generation_unavailable_without_key() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = teacher_token(&client, &address).await;

    let resp = client
        .post(format!("{}/api/exams/generate", address))
        .bearer_auth(&token)
        .json(&json!({ "prompt": "Kesirler" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 503);

    let resp = client
        .post(format!("{}/api/exams/generate", address))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
