//! Behaviour of issuance, exchange and revocation at the service boundary.

mod common;

use common::{TestApp, DEPENDENT_A1, DEPENDENT_A2, DEPENDENT_B1, GUARDIAN_A, GUARDIAN_B};
use credential_service::{
    services::{CredentialError, IssueOptions, SessionRole},
    utils::ImageRenderer,
};
use std::{collections::HashSet, sync::Arc};

const NO_IMAGE: IssueOptions = IssueOptions {
    return_image: false,
};

struct BrokenRenderer;

impl ImageRenderer for BrokenRenderer {
    fn render(&self, _data: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("encoder unavailable"))
    }
}

#[tokio::test]
async fn ten_thousand_issuances_yield_unique_secrets() {
    let app = TestApp::spawn();
    let mut secrets = HashSet::new();

    for _ in 0..10_000 {
        let issued = app
            .service
            .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
            .await
            .unwrap();
        assert_eq!(issued.secret.len(), 64);
        assert!(secrets.insert(issued.secret));
    }

    assert_eq!(app.store.len(), 10_000);
}

#[tokio::test]
async fn issuing_for_another_guardians_dependent_is_forbidden() {
    let app = TestApp::spawn();

    let err = app
        .service
        .issue(GUARDIAN_B, DEPENDENT_A1, IssueOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialError::OwnershipMismatch));
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn issuing_with_unknown_accounts_is_not_found() {
    let app = TestApp::spawn();

    let err = app
        .service
        .issue("65a1f0c2e4b0a1b2c3d4ffff", DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::GuardianNotFound));

    let err = app
        .service
        .issue(GUARDIAN_A, "65a1f0c2e4b0a1b2c3d4ffff", NO_IMAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::DependentNotFound));

    assert!(app.store.is_empty());
}

#[tokio::test]
async fn a_secret_can_be_exchanged_repeatedly() {
    let app = TestApp::spawn();
    let issued = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();

    let first = app.service.exchange(&issued.secret).await.unwrap();
    let second = app.service.exchange(&issued.secret).await.unwrap();

    assert_ne!(first.session_token, second.session_token);
    for session in [&first, &second] {
        let claims = app.jwt.validate_session_token(&session.session_token).unwrap();
        assert_eq!(claims.sub, DEPENDENT_A1);
        assert_eq!(claims.role, SessionRole::Dependent);
        assert_eq!(claims.name.as_deref(), Some("Ada"));
    }
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn concurrent_exchanges_all_succeed() {
    let app = TestApp::spawn();
    let secret = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap()
        .secret;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = app.service.clone();
            let secret = secret.clone();
            tokio::spawn(async move { service.exchange(&secret).await })
        })
        .collect();

    let mut tokens = HashSet::new();
    for handle in handles {
        let session = handle.await.unwrap().unwrap();
        assert!(tokens.insert(session.session_token));
    }
    assert_eq!(tokens.len(), 8);
}

#[tokio::test]
async fn revocation_invalidates_only_that_dependent() {
    let app = TestApp::spawn();
    let revoked = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();
    let sibling = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A2, NO_IMAGE)
        .await
        .unwrap();
    let other_family = app
        .service
        .issue(GUARDIAN_B, DEPENDENT_B1, NO_IMAGE)
        .await
        .unwrap();

    assert_eq!(app.service.revoke_all(DEPENDENT_A1).await.unwrap(), 1);

    let err = app.service.exchange(&revoked.secret).await.unwrap_err();
    assert!(matches!(err, CredentialError::CredentialNotFound));

    assert!(app.service.exchange(&sibling.secret).await.is_ok());
    assert!(app.service.exchange(&other_family.secret).await.is_ok());
}

#[tokio::test]
async fn revocation_is_idempotent() {
    let app = TestApp::spawn();
    for _ in 0..3 {
        app.service
            .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
            .await
            .unwrap();
    }

    assert_eq!(app.service.revoke_all(DEPENDENT_A1).await.unwrap(), 3);
    assert_eq!(app.service.revoke_all(DEPENDENT_A1).await.unwrap(), 0);
}

#[tokio::test]
async fn revocation_ignores_issuing_guardian() {
    let app = TestApp::spawn();
    app.service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();

    // Dependent later moved to another guardian; the old record is still theirs
    app.directory.insert_guardian(credential_service::models::Guardian::new(
        GUARDIAN_B,
        [DEPENDENT_B1, DEPENDENT_A1],
    ));
    app.service
        .issue(GUARDIAN_B, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();

    assert_eq!(app.service.revoke_all(DEPENDENT_A1).await.unwrap(), 2);
}

#[tokio::test]
async fn issue_with_image_then_exchange_end_to_end() {
    let app = TestApp::spawn();

    let issued = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, IssueOptions::default())
        .await
        .unwrap();
    let image = issued.image_data_uri.expect("image should be rendered");
    assert!(image.starts_with("data:image/png;base64,"));

    let session = app.service.exchange(&issued.secret).await.unwrap();
    assert_eq!(session.dependent_id, DEPENDENT_A1);
    assert_eq!(session.expires_in, 3600);

    let claims = app.jwt.validate_session_token(&session.session_token).unwrap();
    assert_eq!(claims.sub, DEPENDENT_A1);
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[tokio::test]
async fn blank_secrets_are_rejected_before_any_lookup() {
    let app = TestApp::spawn();

    for blank in ["", "   ", "\t\n"] {
        let err = app.service.exchange(blank).await.unwrap_err();
        assert!(matches!(err, CredentialError::InvalidArgument(_)));
    }

    assert_eq!(app.store.lookup_count(), 0);
}

#[tokio::test]
async fn unknown_secret_is_not_found() {
    let app = TestApp::spawn();

    let err = app.service.exchange(&"0".repeat(64)).await.unwrap_err();

    assert!(matches!(err, CredentialError::CredentialNotFound));
    assert_eq!(app.store.lookup_count(), 1);
}

#[tokio::test]
async fn secret_lookup_is_case_sensitive() {
    let app = TestApp::spawn();
    let issued = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();

    let err = app
        .service
        .exchange(&issued.secret.to_uppercase())
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::CredentialNotFound));
}

#[tokio::test]
async fn exchange_fails_once_dependent_is_deleted() {
    let app = TestApp::spawn();
    let issued = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();

    app.directory.remove_dependent(DEPENDENT_A1);

    let err = app.service.exchange(&issued.secret).await.unwrap_err();
    assert!(matches!(err, CredentialError::DependentNotFound));
}

#[tokio::test]
async fn issuing_guardian_can_clean_up_after_dependent_is_deleted() {
    let app = TestApp::spawn();
    app.service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();
    app.directory.remove_dependent(DEPENDENT_A1);

    let err = app
        .service
        .ensure_can_manage_credentials(GUARDIAN_B, DEPENDENT_A1)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::DependentNotFound));

    app.service
        .ensure_can_manage_credentials(GUARDIAN_A, DEPENDENT_A1)
        .await
        .unwrap();
    assert_eq!(app.service.revoke_all(DEPENDENT_A1).await.unwrap(), 1);
    assert_eq!(app.store.len(), 0);

    // Nothing left to clean up, so the dependent is simply gone
    let err = app
        .service
        .ensure_can_manage_credentials(GUARDIAN_A, DEPENDENT_A1)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::DependentNotFound));
}

#[tokio::test]
async fn render_failure_is_not_fatal() {
    let app = TestApp::spawn_with_renderer(Arc::new(BrokenRenderer));

    let issued = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, IssueOptions::default())
        .await
        .unwrap();

    assert!(issued.image_data_uri.is_none());
    assert!(app.service.exchange(&issued.secret).await.is_ok());
}

#[tokio::test]
async fn store_outage_surfaces_as_store_error() {
    let app = TestApp::spawn();
    app.store.set_unavailable(true);

    let err = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::Store(_)));

    let err = app.service.exchange(&"a".repeat(64)).await.unwrap_err();
    assert!(matches!(err, CredentialError::Store(_)));

    let err = app.service.revoke_all(DEPENDENT_A1).await.unwrap_err();
    assert!(matches!(err, CredentialError::Store(_)));
}

#[tokio::test]
async fn listing_is_newest_first_and_hides_secrets() {
    let app = TestApp::spawn();
    let older = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = app
        .service
        .issue(GUARDIAN_A, DEPENDENT_A1, NO_IMAGE)
        .await
        .unwrap();

    let summaries = app.service.list(DEPENDENT_A1).await.unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].secret_hint, &newer.secret[..8]);
    assert_eq!(summaries[1].secret_hint, &older.secret[..8]);
    assert!(summaries.iter().all(|s| s.guardian_id == GUARDIAN_A));
}
