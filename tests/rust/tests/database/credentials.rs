//! Credential repository behavior

use std::sync::Arc;

use pretty_assertions::assert_eq;
use pulselink_core::{Credential, CredentialRepository, CredentialType, Provider};
use pulselink_storage::SqliteCredentialRepository;
use tests::db::{count_rows, TestDatabase};
use tests::fixtures::{live_access_token, test_encryptor, TEST_CLIENT};

fn repo() -> (
    Arc<tokio::sync::Mutex<pulselink_storage::Database>>,
    SqliteCredentialRepository,
    tempfile::TempDir,
) {
    let (db, dir) = TestDatabase::new().shared();
    let repo = SqliteCredentialRepository::new(db.clone(), test_encryptor());
    (db, repo, dir)
}

#[tokio::test]
async fn test_save_and_get_access_token() {
    let (_db, repo, _dir) = repo();

    let token = live_access_token(TEST_CLIENT, Provider::Ga4, "ya29.access")
        .with_scope(Some("https://www.googleapis.com/auth/analytics.readonly".into()));
    repo.save(&token).await.expect("Failed to save");

    let loaded = repo
        .get(TEST_CLIENT, Provider::Ga4, CredentialType::AccessToken)
        .await
        .expect("Failed to get")
        .expect("credential should exist");

    assert_eq!(loaded.value, "ya29.access");
    assert_eq!(loaded.token_type.as_deref(), Some("Bearer"));
    assert_eq!(loaded.scope, token.scope);
    assert_eq!(
        loaded.expires_at.map(|t| t.timestamp()),
        token.expires_at.map(|t| t.timestamp())
    );
}

#[tokio::test]
async fn test_save_upserts_per_triple() {
    let (db, repo, _dir) = repo();

    repo.save(&live_access_token(TEST_CLIENT, Provider::Gsc, "first"))
        .await
        .unwrap();
    repo.save(&live_access_token(TEST_CLIENT, Provider::Gsc, "second"))
        .await
        .unwrap();

    assert_eq!(count_rows(&db, "credentials").await, 1);
    let loaded = repo
        .get(TEST_CLIENT, Provider::Gsc, CredentialType::AccessToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.value, "second");
}

#[tokio::test]
async fn test_access_and_refresh_are_independent_rows() {
    let (_db, repo, _dir) = repo();

    repo.save_all(&[
        live_access_token(TEST_CLIENT, Provider::Gbp, "access"),
        Credential::refresh_token(TEST_CLIENT, Provider::Gbp, "refresh"),
    ])
    .await
    .unwrap();

    repo.delete(TEST_CLIENT, Provider::Gbp, CredentialType::AccessToken)
        .await
        .unwrap();

    assert!(repo
        .get(TEST_CLIENT, Provider::Gbp, CredentialType::AccessToken)
        .await
        .unwrap()
        .is_none());
    let refresh = repo
        .get(TEST_CLIENT, Provider::Gbp, CredentialType::RefreshToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refresh.value, "refresh");
    assert!(refresh.expires_at.is_none());
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let (_db, repo, _dir) = repo();

    repo.save(&live_access_token("clinic-a", Provider::Ga4, "token-a"))
        .await
        .unwrap();
    repo.save(&live_access_token("clinic-b", Provider::Gsc, "token-b"))
        .await
        .unwrap();

    assert_eq!(
        repo.list_connected_providers("clinic-a").await.unwrap(),
        vec![Provider::Ga4]
    );
    assert!(repo
        .get("clinic-a", Provider::Gsc, CredentialType::AccessToken)
        .await
        .unwrap()
        .is_none());
    assert_eq!(repo.list_for_client("clinic-b").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_connected_providers_in_canonical_order() {
    let (_db, repo, _dir) = repo();

    for provider in [Provider::Gbp, Provider::Ga4, Provider::Gsc] {
        repo.save(&live_access_token(TEST_CLIENT, provider, "t"))
            .await
            .unwrap();
    }
    // A refresh token alone does not count as connected
    repo.save(&Credential::refresh_token("clinic-x", Provider::Ga4, "r"))
        .await
        .unwrap();

    assert_eq!(
        repo.list_connected_providers(TEST_CLIENT).await.unwrap(),
        vec![Provider::Ga4, Provider::Gsc, Provider::Gbp]
    );
    assert!(repo
        .list_connected_providers("clinic-x")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_all_removes_pair_only() {
    let (db, repo, _dir) = repo();

    repo.save_all(&[
        live_access_token(TEST_CLIENT, Provider::Gsc, "a"),
        Credential::refresh_token(TEST_CLIENT, Provider::Gsc, "r"),
        live_access_token(TEST_CLIENT, Provider::Ga4, "b"),
    ])
    .await
    .unwrap();

    assert_eq!(repo.delete_all(TEST_CLIENT, Provider::Gsc).await.unwrap(), 2);
    assert_eq!(repo.delete_all(TEST_CLIENT, Provider::Gsc).await.unwrap(), 0);
    assert_eq!(count_rows(&db, "credentials").await, 1);
}
