//! High-level client behavior: the cached-GET surface, invalidation after
//! mutations, and the auth/login flow end to end against a mock server.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;

use cohortly_sdk::cache::{CacheConfig, CacheRule};
use cohortly_sdk::prelude::*;

fn client_for(server: &mockito::ServerGuard, store: Arc<MemorySessionStore>) -> CohortlyClient {
    CohortlyClient::builder()
        .base_url(&server.url())
        .no_fallback()
        .timeout(Duration::from_secs(5))
        .session_store(store)
        .build()
        .expect("client builds")
}

fn logged_in_store() -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::with_session(
        Session::new("tok-1")
            .with_refresh_token("rt-1")
            .with_expires_at(chrono::Utc::now() + chrono::Duration::hours(12)),
    ))
}

const STUDY_JSON: &str = r#"{
    "id": "s-1",
    "title": "Visual search latency",
    "status": "draft",
    "owner_id": "u-1",
    "created_at": "2026-04-01T09:00:00Z",
    "updated_at": "2026-04-01T09:00:00Z"
}"#;

#[tokio::test]
async fn cached_get_skips_network_within_ttl() {
    let mut server = mockito::Server::new_async().await;
    let list = server
        .mock("GET", "/api/templates")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"templates": []}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, logged_in_store());

    let first = client.templates().list().await.unwrap();
    let second = client.templates().list().await.unwrap();
    assert!(first.templates.is_empty() && second.templates.is_empty());

    // One network call serviced both reads.
    list.assert_async().await;

    let debug = client.cache_debug().await;
    assert_eq!(debug.size, 1);
    assert_eq!(debug.entries[0].key, "/templates");
}

#[tokio::test]
async fn expired_cache_entry_refetches() {
    let mut server = mockito::Server::new_async().await;
    let list = server
        .mock("GET", "/api/templates")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"templates": []}"#)
        .expect(2)
        .create_async()
        .await;

    let store = logged_in_store();
    let client = CohortlyClient::builder()
        .base_url(&server.url())
        .no_fallback()
        .session_store(store)
        .cache_config(CacheConfig {
            default_ttl: Duration::from_millis(40),
            capacity: 16,
            sweep_probability: 0.0,
            rules: vec![CacheRule {
                prefix: "/templates".into(),
                ttl: Duration::from_millis(40),
                max_entries: 8,
            }],
        })
        .build()
        .unwrap();

    let _ = client.templates().list().await.unwrap();
    std::thread::sleep(Duration::from_millis(60));
    let _ = client.templates().list().await.unwrap();

    list.assert_async().await;
}

#[tokio::test]
async fn create_study_invalidates_listing_cache() {
    let mut server = mockito::Server::new_async().await;
    let list = server
        .mock("GET", "/api/studies")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"studies": [], "total": 0}"#)
        .expect(2)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/api/studies")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(STUDY_JSON)
        .create_async()
        .await;

    let client = client_for(&server, logged_in_store());

    let _ = client.studies().list(None, None).await.unwrap();

    let created = client
        .studies()
        .create(&CreateStudyRequest {
            title: "Visual search latency".into(),
            description: None,
            template_id: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "s-1");
    assert_eq!(created.status, StudyStatus::Draft);

    // The mutation dropped the cached listing, so this one goes out again.
    let _ = client.studies().list(None, None).await.unwrap();

    list.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn list_params_key_the_cache_separately() {
    let mut server = mockito::Server::new_async().await;
    let page1 = server
        .mock("GET", "/api/studies")
        .match_query(mockito::Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"studies": [], "total": 0, "page": 1}"#)
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/api/studies")
        .match_query(mockito::Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"studies": [], "total": 0, "page": 2}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, logged_in_store());

    let a = client.studies().list(Some(1), None).await.unwrap();
    let b = client.studies().list(Some(2), None).await.unwrap();
    // Both served from cache now.
    let a2 = client.studies().list(Some(1), None).await.unwrap();

    assert_eq!(a.page, Some(1));
    assert_eq!(b.page, Some(2));
    assert_eq!(a2.page, Some(1));
    page1.assert_async().await;
    page2.assert_async().await;
}

#[tokio::test]
async fn login_persists_session_and_logout_clears_everything() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth/login")
        .match_body(mockito::Matcher::Json(json!({
            "email": "researcher@lab.example",
            "password": "hunter2",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "session": {
                    "access_token": "tok-1",
                    "refresh_token": "rt-1",
                    "expires_at": 4_102_444_800_i64,
                },
                "user": {"id": "u-1", "email": "researcher@lab.example", "name": "Dana", "role": "researcher", "organization_id": null},
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", "/api/auth/logout")
        .with_status(204)
        .create_async()
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let client = client_for(&server, store.clone());

    assert!(!client.auth().is_authenticated());

    let user = client
        .auth()
        .login("researcher@lab.example", "hunter2")
        .await
        .unwrap();
    assert_eq!(user.id, "u-1");
    assert_eq!(user.role.as_deref(), Some("researcher"));
    assert!(client.auth().is_authenticated());

    let session = store.get().unwrap();
    assert_eq!(session.access_token, "tok-1");
    assert_eq!(session.refresh_token.as_deref(), Some("rt-1"));

    client.auth().logout().await.unwrap();
    assert!(store.get().is_none());
    assert!(!client.auth().is_authenticated());
    assert_eq!(client.cache_debug().await.size, 0);
}

#[tokio::test]
async fn login_with_bad_credentials_keeps_existing_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth/login")
        .with_status(401)
        .create_async()
        .await;

    let store = logged_in_store();
    let client = client_for(&server, store.clone());

    let err = client.auth().login("researcher@lab.example", "typo").await;
    assert!(matches!(
        err,
        Err(SdkError::Auth(AuthError::LoginFailed(_)))
    ));
    // The old session is still there.
    assert_eq!(store.get().unwrap().access_token, "tok-1");
}

#[tokio::test]
async fn payout_carries_a_generated_idempotency_key() {
    let mut server = mockito::Server::new_async().await;
    let payout = server
        .mock("POST", "/api/payments/payouts")
        .match_body(mockito::Matcher::Regex(
            r#""idempotency_key":"[0-9a-f-]{36}""#.into(),
        ))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "po-1",
                "study_id": "s-1",
                "participant_id": "p-1",
                "status": "pending",
                "amount": "12.50",
                "currency": "USD",
                "created_at": "2026-04-02T10:00:00Z",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server, logged_in_store());
    let result = client
        .payments()
        .create_payout("s-1", "p-1", Decimal::new(1250, 2), "USD")
        .await
        .unwrap();

    assert_eq!(result.status, PayoutStatus::Pending);
    assert_eq!(result.amount, Decimal::new(1250, 2));
    payout.assert_async().await;
}

#[tokio::test]
async fn participant_mutations_invalidate_their_study_only() {
    let mut server = mockito::Server::new_async().await;
    let list_s1 = server
        .mock("GET", "/api/studies/s-1/participants")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"participants": [], "total": 0}"#)
        .expect(2)
        .create_async()
        .await;
    let list_s2 = server
        .mock("GET", "/api/studies/s-2/participants")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"participants": [], "total": 0}"#)
        .expect(1)
        .create_async()
        .await;
    let invite = server
        .mock("POST", "/api/studies/s-1/participants")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "p-1",
                "study_id": "s-1",
                "email": "subject@panel.example",
                "status": "invited",
                "invited_at": "2026-04-02T10:00:00Z",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server, logged_in_store());

    let _ = client.participants().list("s-1").await.unwrap();
    let _ = client.participants().list("s-2").await.unwrap();

    let invited = client
        .participants()
        .invite(
            "s-1",
            &InviteRequest {
                email: "subject@panel.example".into(),
                screener_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(invited.status, ParticipantStatus::Invited);

    // s-1's cache entry was dropped, s-2's is still warm.
    let _ = client.participants().list("s-1").await.unwrap();
    let _ = client.participants().list("s-2").await.unwrap();

    list_s1.assert_async().await;
    list_s2.assert_async().await;
    invite.assert_async().await;
}
