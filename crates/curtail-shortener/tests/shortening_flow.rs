//! End-to-end flow over the in-memory store: anonymous identity,
//! create, resolve, list, and asynchronous soft-deletion.

use std::sync::Arc;

use curtail_core::UserStore;
use curtail_identity::{IdentityKey, IdentityService};
use curtail_shortener::{DeletionPipeline, ShortenError, ShortenService};
use curtail_storage::{FileLog, InMemoryStore};
use tempfile::TempDir;

struct Fixture {
    identity: IdentityService,
    service: ShortenService<InMemoryStore>,
    store: Arc<InMemoryStore>,
    _dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let file_log = Arc::new(FileLog::open(dir.path().join("curtail.log")).unwrap());
        let store = Arc::new(InMemoryStore::new());

        Self {
            identity: IdentityService::new(&IdentityKey::generate()),
            service: ShortenService::new(Arc::clone(&store), file_log, "http://localhost:8080/"),
            store,
            _dir: dir,
        }
    }

    fn pipeline(&self) -> DeletionPipeline {
        DeletionPipeline::spawn(Arc::clone(&self.store), 5, 500, 32)
    }
}

#[tokio::test]
async fn anonymous_user_shortens_and_resolves() {
    let fixture = Fixture::new();

    // First request carries no credential: issue one.
    let cred = fixture.identity.issue().unwrap();
    // The cookie comes back on the next request and validates.
    let user_id = fixture.identity.validate(&cred.token).unwrap();
    assert_eq!(user_id, cred.user_id);

    let created = fixture
        .service
        .create(&user_id, "http://example.com")
        .await
        .unwrap();

    // Public redirect: resolution does not need the identity.
    let url = fixture
        .service
        .resolve("", created.key.as_str())
        .await
        .unwrap();
    assert_eq!(url, "http://example.com");

    let links = fixture.service.list_for_user(&user_id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].short_url, created.short_url);
}

#[tokio::test]
async fn tampered_credential_gets_a_fresh_identity() {
    let fixture = Fixture::new();

    let cred = fixture.identity.issue().unwrap();
    let mut tampered = cred.token.clone();
    tampered.replace_range(..1, if cred.token.starts_with('A') { "B" } else { "A" });

    // Fails closed: same path as "no credential presented".
    assert_eq!(fixture.identity.validate(&tampered), None);
    let fresh = fixture.identity.issue().unwrap();
    assert_ne!(fresh.user_id, cred.user_id);
}

#[tokio::test]
async fn second_create_is_a_dedup_conflict_with_the_same_url() {
    let fixture = Fixture::new();

    let first = fixture
        .service
        .create("u1", "http://example.com")
        .await
        .unwrap();
    let second = fixture
        .service
        .create("u1", "http://example.com")
        .await
        .unwrap();

    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert_eq!(first.short_url, second.short_url);
}

#[tokio::test]
async fn drained_deletion_turns_resolution_into_not_found() {
    let fixture = Fixture::new();

    let created = fixture
        .service
        .create("u1", "http://example.com")
        .await
        .unwrap();
    assert!(fixture
        .service
        .resolve("", created.key.as_str())
        .await
        .is_ok());

    let pipeline = fixture.pipeline();
    pipeline
        .submit("u1", vec![created.key.as_str().to_string()])
        .await
        .unwrap();
    pipeline.shutdown().await;

    let err = fixture
        .service
        .resolve("", created.key.as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenError::NotFound(_)));

    // Retained for audit: the store still holds the row.
    assert_eq!(fixture.store.is_deleted(created.key.as_str()), Some(true));
    // And the listing no longer shows it.
    assert!(fixture.service.list_for_user("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_anothers_mapping_changes_nothing() {
    let fixture = Fixture::new();

    let created = fixture
        .service
        .create("u1", "http://example.com")
        .await
        .unwrap();

    let pipeline = fixture.pipeline();
    pipeline
        .submit("intruder", vec![created.key.as_str().to_string()])
        .await
        .unwrap();
    pipeline.shutdown().await;

    let url = fixture
        .service
        .resolve("", created.key.as_str())
        .await
        .unwrap();
    assert_eq!(url, "http://example.com");
}

#[tokio::test]
async fn file_log_mirrors_created_mappings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("curtail.log");

    let key = {
        let file_log = Arc::new(FileLog::open(&path).unwrap());
        let store = Arc::new(InMemoryStore::new());
        let service = ShortenService::new(store, file_log, "http://localhost:8080/");
        service
            .create("u1", "http://example.com")
            .await
            .unwrap()
            .key
    };

    // A restart replays the log: the mapping is still there even
    // though the relational store above was ephemeral.
    let reopened = FileLog::open(&path).unwrap();
    assert_eq!(reopened.find(key.as_str()).unwrap(), "http://example.com");
}

#[tokio::test]
async fn listing_requires_an_identity() {
    let fixture = Fixture::new();
    let err = fixture.service.list_for_user("").await.unwrap_err();
    assert!(matches!(err, ShortenError::EmptyInput(_)));

    // An issued identity always has a non-empty ID, so the guard is
    // unreachable through the normal path.
    let cred = fixture.identity.issue().unwrap();
    assert!(!cred.user_id.is_empty());
    assert!(fixture
        .service
        .list_for_user(&cred.user_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn two_users_shortening_the_same_url_share_the_key() {
    let fixture = Fixture::new();

    let first = fixture
        .service
        .create("u1", "http://example.com")
        .await
        .unwrap();
    let second = fixture
        .service
        .create("u2", "http://example.com")
        .await
        .unwrap();

    // Global key uniqueness: the second user gets the same short URL,
    // flagged as a dedup conflict, and does not gain ownership.
    assert_eq!(first.short_url, second.short_url);
    assert!(second.deduplicated);
    assert!(fixture.service.list_for_user("u2").await.unwrap().is_empty());
    assert!(fixture
        .store
        .find_by_short("u2", first.key.as_str())
        .await
        .is_err());
}
