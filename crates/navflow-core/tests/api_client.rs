use std::sync::Arc;
use std::time::Duration;

use navflow_core::api::{ApiClient, ApiError};
use navflow_core::session::{CredentialStore, FileCredentialStore, Session};
use navflow_shared::TaskCreate;
use parking_lot::Mutex;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn task_json(id: u64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "project": 3,
        "project_name": "Apollo",
        "priority": "high",
        "status": "todo",
        "created_at": "2026-03-01T09:00:00Z"
    })
}

fn client(server: &MockServer, session: Session) -> ApiClient {
    ApiClient::new(
        &format!("{}/api/v1/", server.uri()),
        Duration::from_secs(5),
        Arc::new(Mutex::new(session)),
    )
    .expect("build client")
}

fn signed_in(access: &str, refresh: Option<&str>) -> Session {
    let mut session = Session::ephemeral();
    session.login(access, refresh, None).expect("login");
    session
}

#[tokio::test]
async fn attaches_bearer_and_decodes_page_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/"))
        .and(query_param("project", "3"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [task_json(1, "one"), task_json(2, "two")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, signed_in("a1", Some("r1")));
    let tasks = api.list_tasks(Some(3)).await.expect("list tasks");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].title, "two");
}

#[tokio::test]
async fn refreshes_once_and_replays() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/token/refresh/"))
        .and(body_json(json!({"refresh": "r1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, signed_in("stale", Some("r1")));
    let projects = api.list_projects().await.expect("list projects");
    assert!(projects.is_empty());

    let session = api.session().lock();
    assert_eq!(session.access_token(), Some("fresh"));
    assert_eq!(session.refresh_token(), Some("r1"));
}

#[tokio::test]
async fn failed_refresh_clears_stored_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/orgs/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token is blacklisted"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir");
    let mut session =
        Session::load(Box::new(FileCredentialStore::new(dir.path()))).expect("load session");
    session.login("a1", Some("r1"), None).expect("login");

    let api = client(&server, session);
    let err = api.list_orgs().await.expect_err("refresh must fail");
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(!api.session().lock().is_authenticated());

    let store = FileCredentialStore::new(dir.path());
    assert_eq!(store.get("access_token").expect("read"), None);
    assert_eq!(store.get("refresh_token").expect("read"), None);
}

#[tokio::test]
async fn second_unauthorized_is_not_retried_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/9/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "a2"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, signed_in("a1", Some("r1")));
    let err = api.get_task(9).await.expect_err("still unauthorized");
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(api.session().lock().is_authenticated());
}

#[tokio::test]
async fn missing_refresh_token_expires_without_calling_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/focus/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let api = client(&server, signed_in("a1", None));
    let err = api.list_focus().await.expect_err("no refresh token");
    assert!(matches!(err, ApiError::SessionExpired));
}

#[tokio::test]
async fn validation_errors_surface_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"title": ["This field is required."]})),
        )
        .mount(&server)
        .await;

    let api = client(&server, signed_in("a1", Some("r1")));
    let err = api
        .create_task(&TaskCreate {
            title: String::new(),
            description: String::new(),
            project_id: 3,
            section: None,
            status: navflow_shared::TaskStatus::Todo,
            priority: navflow_shared::Priority::Medium,
            due_date: None,
        })
        .await
        .expect_err("bad request");

    assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
    assert_eq!(err.server_message(), Some("title: This field is required."));
}

#[tokio::test]
async fn login_stores_tokens_without_sending_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/login/"))
        .and(body_json(json!({"email": "ada@example.test", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "a1",
            "refresh": "r1",
            "user": {"id": 5, "email": "ada@example.test", "first_name": "Ada", "last_name": "L"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, Session::ephemeral());
    assert!(matches!(api.require_session(), Err(ApiError::NotSignedIn)));

    let user = api
        .login("ada@example.test", "pw")
        .await
        .expect("login")
        .expect("user returned");
    assert_eq!(user.display_name(), "Ada L");

    let session = api.session().lock();
    assert_eq!(session.access_token(), Some("a1"));
    assert_eq!(session.refresh_token(), Some("r1"));
}

#[tokio::test]
async fn bad_credentials_do_not_trigger_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(
            json!({"detail": "No active account found with the given credentials"}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = client(&server, Session::ephemeral());
    let err = api.login("x@example.test", "nope").await.expect_err("rejected");
    assert_eq!(
        err.server_message(),
        Some("No active account found with the given credentials")
    );
}
