//! HTTP contract tests against a wiremock backend.
//!
//! Covers the request shapes (paths, query, bearer header, bodies) and the
//! status -> error mapping, then drives the dashboard controller end to end.

use justdoit_api::HttpApi;
use justdoit_core::{
    ApiError, AuthFlow, AuthMode, BearerToken, Credentials, Filters, MemoryTokenStore, Navigator,
    NewTask, Priority, PriorityFilter, Route, Session, StatusFilter, TaskApi, TaskId,
    TaskListController, TaskPatch,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn token() -> BearerToken {
    BearerToken::new(TOKEN)
}

fn task_json(id: i64, title: &str, completed: bool, priority: Option<u8>) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "priority": priority,
        "completed": completed,
        "user_id": 1,
        "created_at": "2025-01-04T10:20:30.123456",
        "updated_at": "2025-01-04T10:20:30.123456"
    })
}

#[tokio::test]
async fn login_reads_spaced_token_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "pw"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access token": "jwt-123", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let token = api.login(&Credentials::new("a@b.com", "pw")).await.unwrap();
    assert_eq!(token.as_str(), "jwt-123");
}

#[tokio::test]
async fn login_rejection_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid Credentials"})))
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let err = api.login(&Credentials::new("a@b.com", "nope")).await.unwrap_err();
    assert_eq!(err, ApiError::Auth("Invalid Credentials".into()));
}

#[tokio::test]
async fn register_duplicate_email_surfaces_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Email already registered"})))
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let err = api.register(&Credentials::new("a@b.com", "pw")).await.unwrap_err();
    assert_eq!(err, ApiError::Auth("Email already registered".into()));
}

#[tokio::test]
async fn list_without_filters_sends_no_query_and_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param_is_missing("completed"))
        .and(query_param_is_missing("priority"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_json(1, "a", false, Some(1)),
            task_json(2, "b", true, None),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let tasks = api.list_tasks(&token(), &Filters::default()).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].priority, None);
}

#[tokio::test]
async fn list_with_filters_serializes_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .and(query_param("completed", "false"))
        .and(query_param("priority", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let filters = Filters::new(StatusFilter::Pending, PriorityFilter::Only(Priority::High));
    assert!(api.list_tasks(&token(), &filters).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_posts_title_description_priority() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/todos"))
        .and(body_json(json!({"title": "Buy milk", "description": "", "priority": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(11, "Buy milk", false, Some(1))))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let created = api
        .create_task(
            &token(),
            &NewTask {
                title: "Buy milk".into(),
                description: String::new(),
                priority: Priority::Low,
            },
        )
        .await
        .unwrap();
    assert_eq!(created.id, TaskId(11));
    assert!(!created.completed);
}

#[tokio::test]
async fn update_puts_partial_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/todos/5"))
        .and(body_json(json!({"completed": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(5, "x", true, None)))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let t = api
        .update_task(&token(), TaskId(5), &TaskPatch::completed(true))
        .await
        .unwrap();
    assert!(t.completed);
}

#[tokio::test]
async fn delete_accepts_200_message_and_maps_404() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/todos/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Todo deleted successfully"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/todos/4"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Todo not found"})))
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    api.delete_task(&token(), TaskId(3)).await.unwrap();
    assert_eq!(api.delete_task(&token(), TaskId(4)).await, Err(ApiError::NotFound));
}

#[tokio::test]
async fn rejected_token_is_unauthenticated_and_5xx_is_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid or expired token"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    assert_eq!(
        api.list_tasks(&token(), &Filters::default()).await,
        Err(ApiError::Unauthenticated)
    );
    assert_eq!(
        api.me(&token()).await,
        Err(ApiError::Server {
            status: 503,
            message: "maintenance".into()
        })
    );
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "one"})))
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    assert!(matches!(api.get_task(&token(), TaskId(1)).await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    // port 9 (discard) is not listening in test environments
    let api = HttpApi::new("http://127.0.0.1:9").unwrap();
    assert!(matches!(
        api.list_tasks(&token(), &Filters::default()).await,
        Err(ApiError::Network(_))
    ));
}

#[tokio::test]
async fn login_then_dashboard_fetches_unfiltered_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access token": TOKEN, "token_type": "bearer"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param_is_missing("completed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_json(1, "a", false, Some(2))])))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let mut session = Session::new(MemoryTokenStore::new());
    let mut nav = Navigator::start(session.is_signed_in());
    let mut flow = AuthFlow::new(AuthMode::Login);

    flow.submit(&api, &Credentials::new("a@b.com", "pw"), &mut session, &mut nav)
        .await
        .unwrap();
    assert_eq!(nav.current(), Route::Dashboard);

    let mut dashboard = TaskListController::new(session);
    let req = dashboard.mount();
    dashboard.run(&api, req).await;
    assert_eq!(dashboard.tasks().len(), 1);
}

#[tokio::test]
async fn expired_token_during_toggle_logs_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_json(5, "a", false, None)])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/todos/5"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid or expired token"})))
        .mount(&server)
        .await;

    let api = HttpApi::new(server.uri()).unwrap();
    let mut dashboard = TaskListController::new(Session::new(MemoryTokenStore::with_token(TOKEN)));
    let req = dashboard.mount();
    dashboard.run(&api, req).await;

    let req = dashboard.toggle(TaskId(5));
    dashboard.run(&api, req).await;

    assert_eq!(dashboard.route(), Route::Login);
    assert!(dashboard.tasks().is_empty());
    assert!(!dashboard.session().is_signed_in());
}
