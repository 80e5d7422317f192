#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use auditdesk_api::auth::jwt::{generate_access_token, JwtConfig};
use auditdesk_api::auth::password::hash_password;
use auditdesk_api::config::ServerConfig;
use auditdesk_api::documents::renderer::DocxTemplateRenderer;
use auditdesk_api::router::build_app_router;
use auditdesk_api::state::AppState;
use auditdesk_api::storage::LocalFileStorage;
use auditdesk_core::access::Actor;
use auditdesk_db::models::audit_catalog::{CreateAuditStep, CreateAuditSubstep};
use auditdesk_db::models::organization::CreateOrganization;
use auditdesk_db::models::user::CreateUser;
use auditdesk_db::repositories::{
    AuditStepRepo, AuditSubstepRepo, OrganizationRepo, UserRepo,
};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";

/// Test `ServerConfig` with the dev CORS origin and a fixed JWT secret.
pub fn test_config(storage_root: &Path, templates_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        storage_root: storage_root.to_path_buf(),
        templates_dir: templates_dir.to_path_buf(),
        max_upload_bytes: 20 * 1024 * 1024,
        duplicate_window_secs: 60,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    }
}

/// The application under test plus the directories backing its storage and
/// templates. Dropping it removes both directories.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub config: ServerConfig,
    pub storage_dir: TempDir,
    pub templates_dir: TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Access token for a stored user, carrying their current groups.
    pub async fn token_for(&self, user_id: i64) -> String {
        let user = UserRepo::find_by_id(&self.pool, user_id)
            .await
            .unwrap()
            .expect("user exists");
        let groups = UserRepo::group_names(&self.pool, user_id).await.unwrap();
        let actor = Actor {
            user_id,
            organization_id: user.organization_id,
            is_superuser: user.is_superuser,
            groups,
        };
        generate_access_token(&actor, &self.config.jwt).unwrap()
    }

    /// Write a minimal `.docx` into the templates directory.
    pub fn write_template(&self, file_name: &str, text: &str) {
        let path = self.templates_dir.path().join(file_name);
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(format!("<w:document><w:t>{text}</w:t></w:document>").as_bytes())
            .unwrap();
        zip.finish().unwrap();
    }
}

/// Build the full application router, with the production middleware stack,
/// over the given pool and fresh temporary directories.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let storage_dir = tempfile::tempdir().unwrap();
    let templates_dir = tempfile::tempdir().unwrap();
    let config = test_config(storage_dir.path(), templates_dir.path());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        storage: Arc::new(LocalFileStorage::new(storage_dir.path())),
        renderer: Arc::new(DocxTemplateRenderer::new(templates_dir.path())),
    };
    let router = build_app_router(state, &config);

    TestApp {
        router,
        pool,
        config,
        storage_dir,
        templates_dir,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, json_request(Method::POST, uri, None, &body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, json_request(Method::POST, uri, Some(token), &body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, json_request(Method::PUT, uri, Some(token), &body)).await
}

pub async fn patch_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, json_request(Method::PATCH, uri, Some(token), &body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

const BOUNDARY: &str = "auditdesk-test-boundary";

/// Send a multipart form with a single `file` field.
pub async fn multipart_auth(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    file_name: &str,
    contents: &[u8],
) -> Response {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn expect_status(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body = body_bytes(response).await;
    assert_eq!(
        actual,
        status,
        "unexpected status, body: {}",
        String::from_utf8_lossy(&body)
    );
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

pub async fn seed_org(pool: &PgPool, name: &str) -> i64 {
    OrganizationRepo::create(
        pool,
        &CreateOrganization {
            name: name.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

/// A user with [`PASSWORD`], optionally a superuser and in the given groups.
pub async fn seed_user(
    pool: &PgPool,
    organization_id: i64,
    username: &str,
    is_superuser: bool,
    groups: &[&str],
) -> i64 {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            organization_id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: hash_password(PASSWORD).unwrap(),
            is_superuser,
        },
    )
    .await
    .unwrap();
    for group in groups {
        UserRepo::add_to_group(pool, user.id, group).await.unwrap();
    }
    user.id
}

/// Step 1 with substeps 1..=5, the fifth being team assignment. Returns the
/// substep ids in order.
pub async fn seed_catalog(pool: &PgPool) -> Vec<i64> {
    let step = AuditStepRepo::create(
        pool,
        &CreateAuditStep {
            sort_order: 1,
            title: "Engagement acceptance".to_string(),
            purpose: String::new(),
            documentation: String::new(),
            procedure_description: String::new(),
            expected_result: String::new(),
            is_active: None,
        },
    )
    .await
    .unwrap();

    let mut ids = Vec::new();
    for sort_order in 1..=5 {
        let substep = AuditSubstepRepo::create(
            pool,
            &CreateAuditSubstep {
                step_id: step.id,
                sort_order,
                title: format!("Substep 1.{sort_order}"),
                purpose: String::new(),
                documentation: String::new(),
                procedure_description: String::new(),
                expected_result: String::new(),
                is_active: None,
            },
        )
        .await
        .unwrap();
        ids.push(substep.id);
    }
    ids
}

/// A valid engagement form.
pub fn engagement_body(name: &str, number: &str, period: &str, manager: i64, qa: i64) -> Value {
    json!({
        "name": name,
        "requisites_number": number,
        "requisites_date": "2024-01-15",
        "reporting_period": period,
        "engagement_subject": "O_AUDIT",
        "manager_id": manager,
        "qa_manager_id": qa,
    })
}

/// Create an engagement through the API and return its id.
pub async fn create_engagement(app: &TestApp, token: &str, body: Value) -> i64 {
    let response = post_json_auth(app.app(), "/api/v1/engagements", token, body).await;
    let json = expect_status(response, StatusCode::CREATED).await;
    json["data"]["id"].as_i64().unwrap()
}

/// Make `engagement_id` the caller's active engagement.
pub async fn select_engagement(app: &TestApp, token: &str, engagement_id: i64) {
    let response = put_json_auth(
        app.app(),
        "/api/v1/session/active-engagement",
        token,
        json!({ "engagement_id": engagement_id }),
    )
    .await;
    expect_status(response, StatusCode::OK).await;
}
