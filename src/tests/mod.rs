use std::collections::HashMap;
use std::sync::Arc;

use rocket::{
    http::{Cookie, Header, Status},
    local::asynchronous::{Client, LocalResponse},
    serde::json::{json, Value},
};

use crate::{
    config::Settings,
    external::{
        AccountService, Credentials, Identity, MemoryService, Record, ServiceError,
        ServiceResult, SharedService,
    },
    requests::Message,
    score::ScoreEntry,
    session::{SharedSessions, SESSION_COOKIE},
};

const TEST_EMAIL: &str = "a@b.com";
const TEST_PASSWORD: &str = "x";

fn test_settings(extra: &[(&str, &str)]) -> Settings {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("ACCOUNT_BACKEND".to_owned(), "memory".to_owned());
    vars.insert("SECRET_KEY".to_owned(), "test secret".to_owned());
    for (name, value) in extra {
        vars.insert(name.to_string(), value.to_string());
    }
    Settings::from_lookup(|name| vars.get(name).cloned()).expect("valid test settings")
}

fn memory_service() -> Arc<MemoryService> {
    Arc::new(MemoryService::new().with_account(TEST_EMAIL, TEST_PASSWORD))
}

async fn spawn_client(service: SharedService, extra: &[(&str, &str)]) -> Client {
    Client::tracked(super::build(&test_settings(extra), service))
        .await
        .expect("valid rocket instance")
}

async fn deserialize_response<'a, T: rocket::serde::DeserializeOwned>(
    response: LocalResponse<'a>,
) -> rocket::serde::json::serde_json::Result<T> {
    let string = response.into_string().await.unwrap();
    rocket::serde::json::serde_json::from_str(&string)
}

/// Posts credentials and returns the status and the message of the response.
async fn login(client: &Client, email: &str, password: &str) -> (Status, Message) {
    let response = client
        .post("/login")
        .json(&json!({ "email": email, "password": password }))
        .dispatch()
        .await;
    let status = response.status();
    (status, deserialize_response(response).await.unwrap())
}

async fn submit_score(client: &Client, entry: &Value) -> (Status, Message) {
    let response = client.post("/submit_score").json(entry).dispatch().await;
    let status = response.status();
    (status, deserialize_response(response).await.unwrap())
}

async fn get_scores(client: &Client) -> (Status, Value) {
    let response = client.get("/scores").dispatch().await;
    let status = response.status();
    (status, deserialize_response(response).await.unwrap())
}

fn scenario_entry() -> Value {
    json!({ "player1_id": 1, "player2_id": 2, "score1": 70, "score2": 68 })
}

/// Logs in, submits a score and reads it back
#[rocket::async_test]
async fn login_submit_list() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[]).await;

    let (status, message) = login(&client, TEST_EMAIL, TEST_PASSWORD).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(message, Message::new("Login successful"));

    let (status, message) = submit_score(&client, &scenario_entry()).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(message, Message::new("Score submitted"));

    let (status, scores) = get_scores(&client).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(scores, json!([scenario_entry()]));
    assert_eq!(service.row_count("scores").await, 1);
}

#[rocket::async_test]
async fn submit_without_login_is_unauthorized() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[]).await;

    let (status, message) = submit_score(&client, &scenario_entry()).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(message, Message::new("Unauthorized"));
    assert_eq!(service.row_count("scores").await, 0);
}

#[rocket::async_test]
async fn rejected_login_creates_no_session() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[]).await;

    let response = client
        .post("/login")
        .json(&json!({ "email": TEST_EMAIL, "password": "wrong" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert!(response.cookies().get(SESSION_COOKIE).is_none());
    let message: Message = deserialize_response(response).await.unwrap();
    assert_eq!(message, Message::new("Login failed"));

    let (status, _) = submit_score(&client, &scenario_entry()).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(service.row_count("scores").await, 0);
}

#[rocket::async_test]
async fn duplicate_submissions_store_two_rows() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[]).await;
    login(&client, TEST_EMAIL, TEST_PASSWORD).await;

    let entries = vec![
        ScoreEntry::new(1, 2, 70, 68),
        ScoreEntry::new(1, 2, 70, 68),
        ScoreEntry::new("p-3", "p-4", 75, 80),
    ];
    for entry in &entries {
        let (status, _) = submit_score(&client, &json!(entry)).await;
        assert_eq!(status, Status::Ok);
    }

    let (_, scores) = get_scores(&client).await;
    assert_eq!(scores, json!(entries));
    assert_eq!(service.row_count("scores").await, 3);
}

/// Ids and scores are stored as sent, whatever their JSON type
#[rocket::async_test]
async fn loosely_typed_values_are_stored_verbatim() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[]).await;
    login(&client, TEST_EMAIL, TEST_PASSWORD).await;

    let entries = [
        json!({ "player1_id": 1, "player2_id": 2, "score1": "70", "score2": 68 }),
        json!({ "player1_id": 1, "player2_id": 2, "score1": 70.5, "score2": 68 }),
        json!({ "player1_id": 1.0, "player2_id": 2, "score1": 70, "score2": 68 }),
        json!({ "player1_id": 3000000000u64, "player2_id": "b7c1", "score1": 70, "score2": 68 }),
    ];
    for entry in &entries {
        let (status, message) = submit_score(&client, entry).await;
        assert_eq!(status, Status::Ok, "{}", entry);
        assert_eq!(message, Message::new("Score submitted"));
    }

    let (_, scores) = get_scores(&client).await;
    assert_eq!(scores, json!(entries));
    assert_eq!(service.row_count("scores").await, 4);
}

/// Clients that drop the cookie cannot grow the session store without bound
#[rocket::async_test]
async fn cookieless_logins_stay_bounded() {
    let client = Client::untracked(super::build(
        &test_settings(&[("SESSION_MAX", "2")]),
        memory_service(),
    ))
    .await
    .expect("valid rocket instance");

    for _ in 0..10 {
        let (status, _) = login(&client, TEST_EMAIL, TEST_PASSWORD).await;
        assert_eq!(status, Status::Ok);
    }

    let sessions = client.rocket().state::<SharedSessions>().unwrap();
    assert_eq!(sessions.len().await, 2);
}

#[rocket::async_test]
async fn logout_ends_the_session() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[]).await;

    let response = client.post("/logout").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);

    login(&client, TEST_EMAIL, TEST_PASSWORD).await;
    let response = client.post("/logout").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let message: Message = deserialize_response(response).await.unwrap();
    assert_eq!(message, Message::new("Logout successful"));

    let (status, _) = submit_score(&client, &scenario_entry()).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(service.row_count("scores").await, 0);
}

#[rocket::async_test]
async fn forged_and_unknown_session_cookies_are_rejected() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[]).await;

    // Not encrypted with the server key
    let response = client
        .post("/submit_score")
        .cookie(Cookie::new(SESSION_COOKIE, "forged"))
        .json(&scenario_entry())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // Encrypted correctly but never issued
    let response = client
        .post("/submit_score")
        .private_cookie(Cookie::new(SESSION_COOKIE, "never-issued"))
        .json(&scenario_entry())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    assert_eq!(service.row_count("scores").await, 0);
}

#[rocket::async_test]
async fn malformed_bodies_are_bad_requests() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[]).await;

    let response = client
        .post("/login")
        .json(&json!({ "email": TEST_EMAIL }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let message: Message = deserialize_response(response).await.unwrap();
    assert!(message.message.starts_with("Malformed request"));

    let response = client
        .post("/login")
        .header(Header::new("Content-Type", "application/json"))
        .body("{not json")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let (status, message) = login(&client, "  ", TEST_PASSWORD).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(
        message,
        Message::new("Malformed request: email must not be empty")
    );

    login(&client, TEST_EMAIL, TEST_PASSWORD).await;
    let (status, message) = submit_score(
        &client,
        &json!({ "player1_id": 1, "player2_id": 2, "score1": 70 }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert!(message.message.starts_with("Malformed request"));
    assert_eq!(service.row_count("scores").await, 0);
}

#[rocket::async_test]
async fn scores_can_require_a_session() {
    let service = memory_service();
    let client = spawn_client(service.clone(), &[("SCORES_REQUIRE_AUTH", "true")]).await;

    let response = client.get("/scores").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let message: Message = deserialize_response(response).await.unwrap();
    assert_eq!(message, Message::new("Unauthorized"));

    login(&client, TEST_EMAIL, TEST_PASSWORD).await;
    let (status, scores) = get_scores(&client).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(scores, json!([]));
}

#[rocket::async_test]
async fn scores_are_public_by_default() {
    let service = memory_service();
    let writer = spawn_client(service.clone(), &[]).await;
    login(&writer, TEST_EMAIL, TEST_PASSWORD).await;
    submit_score(&writer, &scenario_entry()).await;

    let reader = spawn_client(service.clone(), &[]).await;
    let (status, scores) = get_scores(&reader).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(scores, json!([scenario_entry()]));
}

/// Accepts every login and fails every row operation.
struct UnreachableStore;

#[rocket::async_trait]
impl AccountService for UnreachableStore {
    async fn authenticate(&self, credentials: &Credentials) -> ServiceResult<Option<Identity>> {
        Ok(Some(Identity {
            id: "user-1".to_owned(),
            email: Some(credentials.email.clone()),
        }))
    }

    async fn insert_row(&self, _table: &str, _record: &Record) -> ServiceResult<()> {
        Err(ServiceError::Status {
            status: 503,
            body: "service unavailable".to_owned(),
        })
    }

    async fn select_all(&self, _table: &str) -> ServiceResult<Vec<Record>> {
        Err(ServiceError::Decode("connection reset".to_owned()))
    }
}

#[rocket::async_test]
async fn external_failures_are_bad_gateway() {
    let client = spawn_client(Arc::new(UnreachableStore), &[]).await;

    let (status, _) = login(&client, TEST_EMAIL, TEST_PASSWORD).await;
    assert_eq!(status, Status::Ok);

    let (status, message) = submit_score(&client, &scenario_entry()).await;
    assert_eq!(status, Status::BadGateway);
    assert_eq!(message, Message::new("External service error"));

    let response = client.get("/scores").dispatch().await;
    assert_eq!(response.status(), Status::BadGateway);
    let message: Message = deserialize_response(response).await.unwrap();
    assert_eq!(message, Message::new("External service error"));
}

#[rocket::async_test]
async fn index_and_unknown_routes() {
    let client = spawn_client(memory_service(), &[]).await;

    let response = client.get("/").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.into_string().await.unwrap(),
        "Welcome to the Golf Tournament API"
    );

    let response = client.get("/leaderboard").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let message: Message = deserialize_response(response).await.unwrap();
    assert_eq!(message, Message::new("Not found"));
}

#[rocket::async_test]
async fn cors_headers_on_every_response() {
    let client = spawn_client(memory_service(), &[]).await;

    let response = client.get("/scores").dispatch().await;
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("*")
    );

    let response = client.options("/submit_score").dispatch().await;
    assert_eq!(response.status(), Status::NoContent);
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Methods"),
        Some("GET, POST, OPTIONS")
    );

    let client = spawn_client(
        memory_service(),
        &[("CORS_ALLOW_ORIGIN", "https://scores.example")],
    )
    .await;
    let response = client.get("/").dispatch().await;
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("https://scores.example")
    );
}
