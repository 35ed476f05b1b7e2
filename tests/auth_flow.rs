//! End-to-end coverage of login/refresh/logout against a real,
//! migration-provisioned Postgres database (see tokens.rs's deferred
//! test comment). Each `#[sqlx::test]` gets its own ephemeral database
//! with the crate's migrations already applied.

use chrono::{Duration as ChronoDuration, Utc};
use deckvault_core::models::Role;
use deckvault_core::repo::{PrincipalRepo, RefreshTokenRepo};
use deckvault_core::tokens::TokenService;
use sqlx::PgPool;
use std::time::Duration;

const TEST_PRIVATE_KEY: &[u8] = include_bytes!("fixtures/test_rsa_private.pem");
const TEST_PUBLIC_KEY: &[u8] = include_bytes!("fixtures/test_rsa_public.pem");

fn service(pool: &PgPool) -> TokenService {
    TokenService::new(
        TEST_PRIVATE_KEY,
        TEST_PUBLIC_KEY,
        Duration::from_secs(900),
        Duration::from_secs(604_800),
        RefreshTokenRepo::new(pool.clone()),
        PrincipalRepo::new(pool.clone()),
    )
    .expect("RSA test fixtures should be valid PEM keys")
}

async fn insert_principal(pool: &PgPool, username: &str, password: &str, role: Role) {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).expect("bcrypt hash");
    sqlx::query("INSERT INTO principals (username, password_hash, role, enabled) VALUES ($1, $2, $3, true)")
        .bind(username)
        .bind(hash)
        .bind(role.storage_name())
        .execute(pool)
        .await
        .expect("insert test principal");
}

#[sqlx::test]
async fn login_refresh_logout_round_trip(pool: PgPool) {
    insert_principal(&pool, "flow_user1", "s3cr3t-pass", Role::User).await;
    let principals = PrincipalRepo::new(pool.clone());
    let principal = principals.find_by_username("flow_user1").await.unwrap().unwrap();

    let tokens = service(&pool);

    let issued = tokens.login(&principal, "s3cr3t-pass").await.expect("login should succeed");
    let claims = tokens.verify_access_token(&issued.access_token).expect("access token should verify");
    assert_eq!(claims.sub, "flow_user1");
    assert_eq!(claims.roles, vec!["USER".to_string()]);

    let refreshed = tokens.refresh(&issued.refresh_token).await.expect("refresh should succeed");
    assert!(tokens.verify_access_token(&refreshed.access_token).is_ok());

    tokens.logout(&refreshed.refresh_token).await.expect("logout should succeed");

    let after_logout = tokens.refresh(&refreshed.refresh_token).await;
    assert!(after_logout.is_err(), "refreshing a revoked token must fail");
}

#[sqlx::test]
async fn login_rejects_wrong_password(pool: PgPool) {
    insert_principal(&pool, "flow_user2", "correct-horse", Role::User).await;
    let principals = PrincipalRepo::new(pool.clone());
    let principal = principals.find_by_username("flow_user2").await.unwrap().unwrap();

    let tokens = service(&pool);
    let result = tokens.login(&principal, "wrong-password").await;
    assert!(result.is_err());
}

#[sqlx::test]
async fn refresh_rejects_expired_token(pool: PgPool) {
    insert_principal(&pool, "flow_user3", "whatever", Role::User).await;
    let refresh_tokens = RefreshTokenRepo::new(pool.clone());
    let expired_at = Utc::now() - ChronoDuration::seconds(5);
    refresh_tokens.insert("expired-token-fixture", "flow_user3", expired_at).await.unwrap();

    let tokens = service(&pool);
    let result = tokens.refresh("expired-token-fixture").await;
    assert!(result.is_err());
}

#[sqlx::test]
async fn revoke_all_invalidates_every_session(pool: PgPool) {
    insert_principal(&pool, "flow_user4", "whatever", Role::User).await;
    let principals = PrincipalRepo::new(pool.clone());
    let principal = principals.find_by_username("flow_user4").await.unwrap().unwrap();

    let tokens = service(&pool);
    let first = tokens.login(&principal, "whatever").await.unwrap();
    let second = tokens.login(&principal, "whatever").await.unwrap();

    let revoked = tokens.revoke_all("flow_user4").await.unwrap();
    assert_eq!(revoked, 2);

    assert!(tokens.refresh(&first.refresh_token).await.is_err());
    assert!(tokens.refresh(&second.refresh_token).await.is_err());
}
