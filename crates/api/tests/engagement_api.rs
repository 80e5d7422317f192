//! Integration tests for engagement CRUD, completion, team assignment and
//! contract scans.

mod common;

use auditdesk_db::repositories::DocumentRepo;
use axum::http::{Method, StatusCode};
use common::{
    body_json, delete_auth, engagement_body, expect_status, get_auth, multipart_auth,
    post_json_auth, put_json_auth,
};
use serde_json::{json, Value};
use sqlx::PgPool;

struct Firm {
    app: common::TestApp,
    admin: String,
    manager: String,
    manager_id: i64,
    qa_id: i64,
    auditor_id: i64,
}

async fn firm(pool: PgPool) -> Firm {
    let app = common::build_test_app(pool.clone());
    let org = common::seed_org(&pool, "Audit LLC").await;
    let admin_id = common::seed_user(&pool, org, "admin", true, &[]).await;
    let manager_id = common::seed_user(&pool, org, "manager", false, &["manager"]).await;
    let qa_id = common::seed_user(&pool, org, "qa", false, &[]).await;
    let auditor_id = common::seed_user(&pool, org, "auditor", false, &[]).await;
    Firm {
        admin: app.token_for(admin_id).await,
        manager: app.token_for(manager_id).await,
        app,
        manager_id,
        qa_id,
        auditor_id,
    }
}

fn field_names(json: &Value) -> Vec<String> {
    json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_reports_every_missing_field(pool: PgPool) {
    let f = firm(pool).await;
    let response =
        post_json_auth(f.app.app(), "/api/v1/engagements", &f.admin, json!({ "name": "  " })).await;

    let json = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let fields = field_names(&json);
    for expected in [
        "name",
        "requisites_number",
        "requisites_date",
        "reporting_period",
        "engagement_subject",
        "manager_id",
        "qa_manager_id",
    ] {
        assert!(fields.iter().any(|f| f == expected), "missing {expected} in {fields:?}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_malformed_period_and_unknown_subject(pool: PgPool) {
    let f = firm(pool).await;
    let mut body = engagement_body("Acme", "7/24", "4 квартал 2023", f.manager_id, f.qa_id);
    body["engagement_subject"] = json!("NOT_A_SUBJECT");

    let json = expect_status(
        post_json_auth(f.app.app(), "/api/v1/engagements", &f.admin, body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    let fields = field_names(&json);
    assert!(fields.contains(&"reporting_period".to_string()));
    assert!(fields.contains(&"engagement_subject".to_string()));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn created_engagement_keeps_only_the_leads(pool: PgPool) {
    let f = firm(pool).await;
    let mut body = engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id);
    body["auditor_id"] = json!(f.auditor_id);

    let json = expect_status(
        post_json_auth(f.app.app(), "/api/v1/engagements", &f.admin, body).await,
        StatusCode::CREATED,
    )
    .await;
    let data = &json["data"];
    assert_eq!(data["manager_id"], f.manager_id);
    assert_eq!(data["qa_manager_id"], f.qa_id);
    assert_eq!(data["auditor_id"], Value::Null);
    assert_eq!(data["is_completed"], false);
    assert!(data["display_label"].as_str().unwrap().starts_with("Acme | 2023"));
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn completion_requires_scan_and_controls(pool: PgPool) {
    let f = firm(pool).await;
    let form = engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id);
    let id = common::create_engagement(&f.app, &f.admin, form.clone()).await;
    let complete_uri = format!("/api/v1/engagements/{id}/complete");

    let json = expect_status(
        post_json_auth(f.app.app(), &complete_uri, &f.manager, json!({})).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("audit report scan"));
    assert!(message.contains("working-paper controls"));

    let response = multipart_auth(
        f.app.app(),
        Method::PUT,
        &format!("/api/v1/engagements/{id}/audit-report-scan"),
        &f.manager,
        "report.pdf",
        b"%PDF-1.4 signed",
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert!(json["data"]["audit_report_scan"].is_string());

    let mut updated = form;
    updated["cw_controls_done"] = json!(true);
    let response = put_json_auth(
        f.app.app(),
        &format!("/api/v1/engagements/{id}"),
        &f.manager,
        updated,
    )
    .await;
    expect_status(response, StatusCode::OK).await;

    let json = expect_status(
        post_json_auth(f.app.app(), &complete_uri, &f.manager, json!({})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["is_completed"], true);

    let response = post_json_auth(f.app.app(), &complete_uri, &f.manager, json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Completed engagements leave the dashboard for the archive.
    let active = body_json(get_auth(f.app.app(), "/api/v1/engagements", &f.manager).await).await;
    assert_eq!(active["data"], json!([]));
    let archive =
        body_json(get_auth(f.app.app(), "/api/v1/engagements/archive", &f.manager).await).await;
    assert_eq!(archive["data"][0]["id"], id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completed_engagement_cannot_be_selected(pool: PgPool) {
    let f = firm(pool.clone()).await;
    let id = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id),
    )
    .await;
    sqlx::query("UPDATE engagements SET is_completed = true WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let response = put_json_auth(
        f.app.app(),
        "/api/v1/session/active-engagement",
        &f.manager,
        json!({ "engagement_id": id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn team_assignment_propagates_to_sibling_engagements(pool: PgPool) {
    let f = firm(pool.clone()).await;
    common::seed_catalog(&pool).await;

    let first = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id),
    )
    .await;
    let second = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "1 квартал 2024", f.manager_id, f.qa_id),
    )
    .await;

    let response = put_json_auth(
        f.app.app(),
        &format!("/api/v1/engagements/{first}/team"),
        &f.manager,
        json!({
            "manager_id": f.manager_id,
            "qa_manager_id": f.qa_id,
            "auditor_id": f.auditor_id,
        }),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["engagement"]["auditor_id"], f.auditor_id);
    assert_eq!(json["data"]["team"]["can_manage_step15"], true);

    let sibling = body_json(
        get_auth(f.app.app(), &format!("/api/v1/engagements/{second}"), &f.manager).await,
    )
    .await;
    assert_eq!(sibling["data"]["auditor_id"], f.auditor_id);

    let team = body_json(
        get_auth(f.app.app(), &format!("/api/v1/engagements/{second}/team"), &f.manager).await,
    )
    .await;
    assert_eq!(team["data"]["rows"].as_array().unwrap().len(), 9);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn team_assignment_does_not_reach_other_contracts(pool: PgPool) {
    let f = firm(pool.clone()).await;
    common::seed_catalog(&pool).await;

    let first = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id),
    )
    .await;
    let other = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "8/24", "2023", f.manager_id, f.qa_id),
    )
    .await;

    let response = put_json_auth(
        f.app.app(),
        &format!("/api/v1/engagements/{first}/team"),
        &f.manager,
        json!({
            "manager_id": f.manager_id,
            "qa_manager_id": f.qa_id,
            "assistant_id": f.auditor_id,
        }),
    )
    .await;
    expect_status(response, StatusCode::OK).await;

    let json = body_json(
        get_auth(f.app.app(), &format!("/api/v1/engagements/{other}"), &f.manager).await,
    )
    .await;
    assert_eq!(json["data"]["assistant_id"], Value::Null);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn team_assignment_requires_leads_and_a_configured_step(pool: PgPool) {
    let f = firm(pool.clone()).await;
    let id = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id),
    )
    .await;
    let uri = format!("/api/v1/engagements/{id}/team");
    let team = json!({ "manager_id": f.manager_id, "qa_manager_id": f.qa_id });

    let response = put_json_auth(f.app.app(), &uri, &f.manager, team.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    common::seed_catalog(&pool).await;
    let json = expect_status(
        put_json_auth(f.app.app(), &uri, &f.manager, json!({ "manager_id": f.manager_id })).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(field_names(&json), vec!["qa_manager_id".to_string()]);

    let qa_token = f.app.token_for(f.qa_id).await;
    let response = put_json_auth(f.app.app(), &uri, &qa_token, team.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json_auth(f.app.app(), &uri, &f.manager, team).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn team_members_must_belong_to_the_organization(pool: PgPool) {
    let f = firm(pool.clone()).await;
    let other_org = common::seed_org(&pool, "Rival LLP").await;
    let stranger = common::seed_user(&pool, other_org, "stranger", false, &[]).await;

    let json = expect_status(
        post_json_auth(
            f.app.app(),
            "/api/v1/engagements",
            &f.admin,
            engagement_body("Acme", "7/24", "2023", stranger, f.qa_id),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(field_names(&json), vec!["team".to_string()]);
}

// ---------------------------------------------------------------------------
// Contract scans
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn contract_scan_is_shared_by_sibling_engagements(pool: PgPool) {
    let f = firm(pool.clone()).await;
    let first = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id),
    )
    .await;
    let second = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "1 квартал 2024", f.manager_id, f.qa_id),
    )
    .await;

    let response = multipart_auth(
        f.app.app(),
        Method::POST,
        &format!("/api/v1/engagements/{first}/contract-scan"),
        &f.manager,
        "contract.pdf",
        b"%PDF-1.4 contract",
    )
    .await;
    let json = expect_status(response, StatusCode::CREATED).await;
    let documents = json["data"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert!(documents.iter().all(|d| d["doc_type"] == "agreement"));
    assert_eq!(documents[0]["storage_key"], documents[1]["storage_key"]);

    let listed = body_json(
        get_auth(
            f.app.app(),
            &format!("/api/v1/documents?engagement_id={second}"),
            &f.manager,
        )
        .await,
    )
    .await;
    assert_eq!(listed["data"][0]["original_name"], "contract.pdf");

    // A later engagement on the same contract picks up the agreement.
    let third = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "2 квартал 2024", f.manager_id, f.qa_id),
    )
    .await;
    let copied = DocumentRepo::list_for_engagement(&pool, third).await.unwrap();
    assert_eq!(copied.len(), 1);
    assert_eq!(copied[0].doc_type, "agreement");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn contract_scan_must_be_a_document(pool: PgPool) {
    let f = firm(pool).await;
    let id = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id),
    )
    .await;

    let response = multipart_auth(
        f.app.app(),
        Method::POST,
        &format!("/api/v1/engagements/{id}/contract-scan"),
        &f.manager,
        "contract.exe",
        b"MZ",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_an_engagement_keeps_files_siblings_still_use(pool: PgPool) {
    let f = firm(pool.clone()).await;
    let first = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "2023", f.manager_id, f.qa_id),
    )
    .await;
    let second = common::create_engagement(
        &f.app,
        &f.admin,
        engagement_body("Acme", "7/24", "1 квартал 2024", f.manager_id, f.qa_id),
    )
    .await;
    let json = expect_status(
        multipart_auth(
            f.app.app(),
            Method::POST,
            &format!("/api/v1/engagements/{first}/contract-scan"),
            &f.manager,
            "contract.pdf",
            b"%PDF-1.4 contract",
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let key = json["data"][0]["storage_key"].as_str().unwrap().to_string();

    let response = delete_auth(f.app.app(), &format!("/api/v1/engagements/{first}"), &f.manager).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get_auth(f.app.app(), &format!("/api/v1/engagements/{first}"), &f.manager).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(f.app.storage_dir.path().join(&key).exists());

    let response = delete_auth(f.app.app(), &format!("/api/v1/engagements/{second}"), &f.manager).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!f.app.storage_dir.path().join(&key).exists());
}
