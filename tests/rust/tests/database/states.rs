//! Authorization state persistence

use chrono::Duration;
use pretty_assertions::assert_eq;
use pulselink_core::{AuthorizationState, AuthorizationStateRepository, Provider};
use pulselink_storage::SqliteAuthorizationStateRepository;
use tests::db::{count_rows, TestDatabase};
use tests::fixtures::{test_encryptor, TEST_CLIENT};

fn pending(state: &str, provider: Provider, ttl: Duration) -> AuthorizationState {
    AuthorizationState::new(
        state,
        TEST_CLIENT,
        provider,
        "pkce-verifier-value",
        format!("https://app.example.com/callback/{}", provider.id()),
        ttl,
    )
}

#[tokio::test]
async fn test_state_is_consumed_once() {
    let (db, _dir) = TestDatabase::new().shared();
    let repo = SqliteAuthorizationStateRepository::new(db.clone(), test_encryptor());

    repo.save(&pending("abc123456789", Provider::Ga4, Duration::minutes(10)))
        .await
        .unwrap();
    assert_eq!(count_rows(&db, "authorization_states").await, 1);

    let first = repo.consume("abc123456789").await.unwrap().unwrap();
    assert_eq!(first.provider, Provider::Ga4);
    assert_eq!(first.pkce_verifier, "pkce-verifier-value");
    assert_eq!(first.redirect_uri, "https://app.example.com/callback/ga4");

    assert!(repo.consume("abc123456789").await.unwrap().is_none());
    assert_eq!(count_rows(&db, "authorization_states").await, 0);
}

#[tokio::test]
async fn test_concurrent_consume_has_one_winner() {
    let (db, _dir) = TestDatabase::new().shared();
    let repo = std::sync::Arc::new(SqliteAuthorizationStateRepository::new(db, test_encryptor()));
    repo.save(&pending("race-state", Provider::Gsc, Duration::minutes(10)))
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.consume("race-state").await.unwrap().is_some() })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_cleanup_only_removes_expired() {
    let (db, _dir) = TestDatabase::new().shared();
    let repo = SqliteAuthorizationStateRepository::new(db.clone(), test_encryptor());

    repo.save(&pending("expired-1", Provider::Gbp, Duration::seconds(-5)))
        .await
        .unwrap();
    repo.save(&pending("expired-2", Provider::Gbp, Duration::seconds(-5)))
        .await
        .unwrap();
    repo.save(&pending("live-1", Provider::Gbp, Duration::minutes(5)))
        .await
        .unwrap();

    assert_eq!(repo.cleanup_expired().await.unwrap(), 2);
    assert_eq!(count_rows(&db, "authorization_states").await, 1);
}
