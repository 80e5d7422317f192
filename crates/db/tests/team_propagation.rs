//! Integration tests for engagement saves and team propagation across
//! engagements that share one contract.

use auditdesk_core::team::TeamAssignment;
use auditdesk_db::models::engagement::EngagementInput;
use auditdesk_db::models::organization::CreateOrganization;
use auditdesk_db::models::user::CreateUser;
use auditdesk_db::repositories::{EngagementRepo, OrganizationRepo, UserRepo};
use chrono::NaiveDate;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_org(pool: &PgPool) -> i64 {
    OrganizationRepo::create(
        pool,
        &CreateOrganization {
            name: "Audit LLC".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_user(pool: &PgPool, organization_id: i64, username: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            organization_id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "x".to_string(),
            is_superuser: false,
        },
    )
    .await
    .unwrap()
    .id
}

fn input(name: &str, number: Option<&str>, period: &str) -> EngagementInput {
    EngagementInput {
        name: name.to_string(),
        requisites_number: number.map(String::from),
        requisites_date: NaiveDate::from_ymd_opt(2024, 1, 15),
        reporting_period: Some(period.to_string()),
        engagement_subject: Some("O_AUDIT".to_string()),
        ..EngagementInput::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn new_engagement_inherits_sibling_team(pool: PgPool) {
    let org = seed_org(&pool).await;
    let lead = seed_user(&pool, org, "lead").await;
    let qa = seed_user(&pool, org, "qa").await;
    let other = seed_user(&pool, org, "other").await;

    let first = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", Some("7/24"), "2023"),
        TeamAssignment::for_creation(Some(lead), Some(qa)),
    )
    .await
    .unwrap();

    let second = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", Some("7/24"), "1 квартал 2024"),
        TeamAssignment::for_creation(Some(other), Some(other)),
    )
    .await
    .unwrap();

    assert_eq!(second.team(), first.team());
    assert_eq!(second.manager_id, Some(lead));
    assert_eq!(second.status, "new");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn team_assignment_propagates_to_siblings(pool: PgPool) {
    let org = seed_org(&pool).await;
    let lead = seed_user(&pool, org, "lead").await;
    let qa = seed_user(&pool, org, "qa").await;
    let auditor = seed_user(&pool, org, "auditor").await;

    let team = TeamAssignment::for_creation(Some(lead), Some(qa));
    let a = EngagementRepo::create(&pool, org, &input("Acme", Some("7/24"), "2023"), team)
        .await
        .unwrap();
    let b = EngagementRepo::create(&pool, org, &input("Acme", Some("7/24"), "2024"), team)
        .await
        .unwrap();
    let unrelated = EngagementRepo::create(&pool, org, &input("Acme", Some("8/24"), "2024"), team)
        .await
        .unwrap();

    let mut changed = a.team();
    changed.auditor_id = Some(auditor);
    EngagementRepo::assign_team(&pool, a.id, changed)
        .await
        .unwrap()
        .expect("engagement exists");

    let b = EngagementRepo::find_by_id(&pool, b.id).await.unwrap().unwrap();
    let unrelated = EngagementRepo::find_by_id(&pool, unrelated.id).await.unwrap().unwrap();
    assert_eq!(b.auditor_id, Some(auditor));
    assert_eq!(unrelated.auditor_id, None);

    let siblings = EngagementRepo::sibling_ids(&pool, &b).await.unwrap();
    assert_eq!(siblings, vec![a.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn engagement_without_contract_number_never_propagates(pool: PgPool) {
    let org = seed_org(&pool).await;
    let lead = seed_user(&pool, org, "lead").await;
    let other = seed_user(&pool, org, "other").await;

    let a = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", None, "2023"),
        TeamAssignment::for_creation(Some(lead), Some(lead)),
    )
    .await
    .unwrap();
    let b = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", None, "2024"),
        TeamAssignment::for_creation(Some(other), Some(other)),
    )
    .await
    .unwrap();

    assert_eq!(b.manager_id, Some(other));
    let a = EngagementRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(a.manager_id, Some(lead));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn edit_keeps_non_lead_slots_and_propagates_lead_change(pool: PgPool) {
    let org = seed_org(&pool).await;
    let lead = seed_user(&pool, org, "lead").await;
    let new_lead = seed_user(&pool, org, "new_lead").await;
    let auditor = seed_user(&pool, org, "auditor").await;

    let team = TeamAssignment::for_creation(Some(lead), Some(lead));
    let a = EngagementRepo::create(&pool, org, &input("Acme", Some("1"), "2023"), team)
        .await
        .unwrap();
    let b = EngagementRepo::create(&pool, org, &input("Acme", Some("1"), "2024"), team)
        .await
        .unwrap();

    let mut with_auditor = a.team();
    with_auditor.auditor_id = Some(auditor);
    let a = EngagementRepo::assign_team(&pool, a.id, with_auditor)
        .await
        .unwrap()
        .unwrap();

    let edited_team = TeamAssignment::with_leads(&a.team(), Some(new_lead), Some(lead));
    let mut form = input("Acme", Some("1"), "2023");
    form.cw_controls_done = true;
    let a = EngagementRepo::update(&pool, a.id, &form, edited_team)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(a.manager_id, Some(new_lead));
    assert_eq!(a.auditor_id, Some(auditor));
    assert!(a.cw_controls_done);

    let b = EngagementRepo::find_by_id(&pool, b.id).await.unwrap().unwrap();
    assert_eq!(b.team(), a.team());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn moving_onto_an_existing_contract_adopts_its_team(pool: PgPool) {
    let org = seed_org(&pool).await;
    let first_lead = seed_user(&pool, org, "first_lead").await;
    let second_lead = seed_user(&pool, org, "second_lead").await;

    let a = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", Some("1/24"), "2023"),
        TeamAssignment::for_creation(Some(first_lead), Some(first_lead)),
    )
    .await
    .unwrap();
    let b = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", Some("2/24"), "2024"),
        TeamAssignment::for_creation(Some(second_lead), Some(second_lead)),
    )
    .await
    .unwrap();

    let b = EngagementRepo::update(&pool, b.id, &input("Acme", Some("1/24"), "2024"), b.team())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(b.contract_identity(), a.contract_identity());
    assert_eq!(b.team(), a.team());
    let a = EngagementRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(a.manager_id, Some(first_lead));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn moving_onto_a_contract_with_a_changed_team_propagates_it(pool: PgPool) {
    let org = seed_org(&pool).await;
    let first_lead = seed_user(&pool, org, "first_lead").await;
    let second_lead = seed_user(&pool, org, "second_lead").await;
    let auditor = seed_user(&pool, org, "auditor").await;

    let a = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", Some("1/24"), "2023"),
        TeamAssignment::for_creation(Some(first_lead), Some(first_lead)),
    )
    .await
    .unwrap();
    let b = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", Some("2/24"), "2024"),
        TeamAssignment::for_creation(Some(second_lead), Some(second_lead)),
    )
    .await
    .unwrap();

    let mut changed = b.team();
    changed.auditor_id = Some(auditor);
    let b = EngagementRepo::update(&pool, b.id, &input("Acme", Some("1/24"), "2024"), changed)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(b.manager_id, Some(second_lead));
    let a = EngagementRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(a.team(), b.team());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn visibility_is_limited_to_team_members(pool: PgPool) {
    let org = seed_org(&pool).await;
    let lead = seed_user(&pool, org, "lead").await;
    let outsider = seed_user(&pool, org, "outsider").await;

    let e = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", Some("1"), "2023"),
        TeamAssignment::for_creation(Some(lead), Some(lead)),
    )
    .await
    .unwrap();

    assert!(EngagementRepo::find_visible(&pool, org, e.id, Some(lead)).await.unwrap().is_some());
    assert!(EngagementRepo::find_visible(&pool, org, e.id, Some(outsider)).await.unwrap().is_none());
    assert!(EngagementRepo::find_visible(&pool, org, e.id, None).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn complete_is_applied_once(pool: PgPool) {
    let org = seed_org(&pool).await;
    let lead = seed_user(&pool, org, "lead").await;

    let e = EngagementRepo::create(
        &pool,
        org,
        &input("Acme", Some("1"), "2023"),
        TeamAssignment::for_creation(Some(lead), Some(lead)),
    )
    .await
    .unwrap();

    let done = EngagementRepo::complete(&pool, e.id, lead).await.unwrap().unwrap();
    assert!(done.is_completed);
    assert_eq!(done.completed_by, Some(lead));
    assert!(done.completed_at.is_some());
    assert!(EngagementRepo::complete(&pool, e.id, lead).await.unwrap().is_none());

    let archive = EngagementRepo::list_archive(&pool, org).await.unwrap();
    assert_eq!(archive.len(), 1);
}
