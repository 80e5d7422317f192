//! Integration tests for role gating and organization scoping.

mod common;

use axum::http::StatusCode;
use common::{body_json, expect_status, get, get_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

struct Firm {
    app: common::TestApp,
    admin: String,
    manager_id: i64,
    manager: String,
    member_id: i64,
    member: String,
    outsider: String,
}

async fn firm(pool: PgPool) -> Firm {
    let app = common::build_test_app(pool.clone());
    let org = common::seed_org(&pool, "Audit LLC").await;
    let admin_id = common::seed_user(&pool, org, "admin", true, &[]).await;
    let manager_id = common::seed_user(&pool, org, "manager", false, &["manager"]).await;
    let member_id = common::seed_user(&pool, org, "member", false, &[]).await;
    let outsider_id = common::seed_user(&pool, org, "outsider", false, &[]).await;

    Firm {
        admin: app.token_for(admin_id).await,
        manager: app.token_for(manager_id).await,
        member: app.token_for(member_id).await,
        outsider: app.token_for(outsider_id).await,
        app,
        manager_id,
        member_id,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn requests_without_a_token_are_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);
    for uri in ["/api/v1/engagements", "/api/v1/audit/steps", "/api/v1/metrics/team"] {
        let response = get(app.app(), uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_a_superuser_creates_engagements(pool: PgPool) {
    let f = firm(pool).await;
    let body = common::engagement_body("Acme", "7/24", "2023", f.manager_id, f.member_id);

    let response = post_json_auth(f.app.app(), "/api/v1/engagements", &f.manager, body.clone()).await;
    let json = expect_status(response, StatusCode::FORBIDDEN).await;
    assert_eq!(json["code"], "FORBIDDEN");

    common::create_engagement(&f.app, &f.admin, body).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn engagements_are_visible_to_team_and_managers_only(pool: PgPool) {
    let f = firm(pool).await;
    let id = common::create_engagement(
        &f.app,
        &f.admin,
        common::engagement_body("Acme", "7/24", "2023", f.manager_id, f.member_id),
    )
    .await;
    let uri = format!("/api/v1/engagements/{id}");

    for token in [&f.admin, &f.manager, &f.member] {
        let response = get_auth(f.app.app(), &uri, token).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = get_auth(f.app.app(), &uri, &f.outsider).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listed = body_json(get_auth(f.app.app(), "/api/v1/engagements", &f.outsider).await).await;
    assert_eq!(listed["data"], json!([]));
    let listed = body_json(get_auth(f.app.app(), "/api/v1/engagements", &f.member).await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_organizations_engagements_are_not_found(pool: PgPool) {
    let f = firm(pool.clone()).await;
    let id = common::create_engagement(
        &f.app,
        &f.admin,
        common::engagement_body("Acme", "7/24", "2023", f.manager_id, f.member_id),
    )
    .await;

    let other_org = common::seed_org(&pool, "Rival LLP").await;
    let rival = common::seed_user(&pool, other_org, "rival", true, &[]).await;
    let rival = f.app.token_for(rival).await;

    let response = get_auth(f.app.app(), &format!("/api/v1/engagements/{id}"), &rival).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn metrics_require_the_manager_group(pool: PgPool) {
    let f = firm(pool).await;
    common::create_engagement(
        &f.app,
        &f.admin,
        common::engagement_body("Acme", "7/24", "2023", f.manager_id, f.member_id),
    )
    .await;

    // Superuser status alone does not grant metrics.
    let response = get_auth(f.app.app(), "/api/v1/metrics/team", &f.admin).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(f.app.app(), "/api/v1/metrics/team", &f.manager).await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["cards"]["total"], 1);
    assert_eq!(json["data"]["rows"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn monitoring_is_for_managers_and_superusers(pool: PgPool) {
    let f = firm(pool).await;

    let response = get_auth(f.app.app(), "/api/v1/monitoring/uploads", &f.member).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    for token in [&f.manager, &f.admin] {
        let response = get_auth(f.app.app(), "/api/v1/monitoring/uploads", token).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn progress_toggle_is_reserved_to_managers(pool: PgPool) {
    let f = firm(pool.clone()).await;
    let substeps = common::seed_catalog(&pool).await;
    let id = common::create_engagement(
        &f.app,
        &f.admin,
        common::engagement_body("Acme", "7/24", "2023", f.manager_id, f.member_id),
    )
    .await;
    let uri = format!("/api/v1/audit/substeps/{}/toggle", substeps[0]);

    common::select_engagement(&f.app, &f.member, id).await;
    let response = post_json_auth(f.app.app(), &uri, &f.member, json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A manager still needs an active engagement.
    let response = post_json_auth(f.app.app(), &uri, &f.manager, json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    common::select_engagement(&f.app, &f.manager, id).await;
    let json = expect_status(
        post_json_auth(f.app.app(), &uri, &f.manager, json!({})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(
        json["data"]["redirect_to"],
        format!("/audit/steps/1?open={}", substeps[0])
    );

    let json = body_json(post_json_auth(f.app.app(), &uri, &f.manager, json!({})).await).await;
    assert_eq!(json["data"]["status"], "not_started");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn catalog_administration_requires_a_superuser(pool: PgPool) {
    let f = firm(pool).await;
    let step = json!({ "sort_order": 2, "title": "Planning" });

    let response = post_json_auth(f.app.app(), "/api/v1/admin/steps", &f.manager, step.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = expect_status(
        post_json_auth(f.app.app(), "/api/v1/admin/steps", &f.admin, step.clone()).await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(json["data"]["sort_order"], 2);

    let response = post_json_auth(f.app.app(), "/api/v1/admin/steps", &f.admin, step).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
