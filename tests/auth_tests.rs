//! Identity chain tests: password hashing, remember tokens and the
//! validate-then-store services
//!
//! Run with: cargo test --test auth_tests

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use photobook::auth::{generate_token, KeyedHasher};
use photobook::config::AuthConfig;
use photobook::error::{Error, ErrorKind};
use photobook::models::{Gallery, OAuthToken, Services, User, OAUTH_DROPBOX};
use photobook::store::MemoryStore;
use tempfile::TempDir;

const HMAC_KEY: &str = "integration-hmac-key";

fn auth_config() -> AuthConfig {
    AuthConfig {
        pepper: "integration-pepper".to_string(),
        hmac_key: HMAC_KEY.to_string(),
        bcrypt_cost: 4,
    }
}

fn services() -> (Services, Arc<MemoryStore>, TempDir) {
    let images = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store.clone(), &auth_config(), images.path());
    (services, store, images)
}

async fn create_user(services: &Services, email: &str, password: &str) -> (User, String) {
    let mut user = User::new("Test User", email, password);
    let remember = services
        .user
        .create(&mut user)
        .await
        .expect("Failed to create user");
    (user, remember)
}

#[tokio::test]
async fn test_create_then_authenticate() {
    let (services, _store, _images) = services();
    let (created, _) = create_user(&services, "alice@example.com", "correct-horse").await;

    let user = services
        .user
        .authenticate("alice@example.com", "correct-horse")
        .await
        .expect("Failed to authenticate");

    assert_eq!(user.id, created.id);
    assert!(user.password.is_empty());
    assert!(!user.password_hash.is_empty());
    assert_ne!(user.password_hash, "correct-horse");
}

#[tokio::test]
async fn test_remember_hash_matches_keyed_hash_of_token() {
    let (services, _store, _images) = services();
    let (created, remember) = create_user(&services, "bob@example.com", "password123").await;

    let hasher = KeyedHasher::new(HMAC_KEY);
    assert_eq!(created.remember_hash, hasher.hash(&remember));

    let copy = remember.clone();
    let found = services
        .user
        .by_remember(&copy)
        .await
        .expect("Failed to look up by remember token");
    assert_eq!(found.id, created.id);
}

#[tokio::test]
async fn test_wrong_password_is_not_not_found() {
    let (services, _store, _images) = services();
    create_user(&services, "carol@example.com", "password123").await;

    let wrong = services
        .user
        .authenticate("carol@example.com", "wrong-password")
        .await;
    assert!(matches!(wrong, Err(Error::PasswordIncorrect)));

    let unknown = services
        .user
        .authenticate("nobody@example.com", "password123")
        .await;
    assert!(matches!(unknown, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_unknown_remember_token() {
    let (services, _store, _images) = services();
    create_user(&services, "dave@example.com", "password123").await;

    let token = generate_token(32).unwrap();
    let result = services.user.by_remember(&token).await;
    assert!(matches!(result, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_gallery_without_owner_is_never_stored() {
    let (services, store, _images) = services();

    let mut gallery = Gallery::new(0, "Holiday");
    let err = services.gallery.create(&mut gallery).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(gallery.id, 0);
    assert_eq!(store.gallery_count().await, 0);
}

#[tokio::test]
async fn test_one_oauth_credential_per_user_and_service() {
    let (services, store, _images) = services();
    let (user, _) = create_user(&services, "erin@example.com", "password123").await;

    for access in ["first-token", "second-token"] {
        let token = OAuthToken {
            access_token: access.to_string(),
            ..Default::default()
        };
        services
            .oauth
            .connect(user.id, OAUTH_DROPBOX, token)
            .await
            .expect("Failed to connect");
    }

    assert_eq!(store.oauth_count().await, 1);
    let stored = services.oauth.find(user.id, OAUTH_DROPBOX).await.unwrap();
    assert_eq!(stored.token.access_token, "second-token");
}

#[tokio::test]
async fn test_delete_rejects_non_positive_ids() {
    let (services, store, _images) = services();
    create_user(&services, "frank@example.com", "password123").await;

    for id in [0, -1, i64::MIN] {
        assert!(matches!(services.user.delete(id).await, Err(Error::InvalidId)));
        assert!(matches!(services.gallery.delete(id).await, Err(Error::InvalidId)));
        assert!(matches!(services.oauth.delete(id).await, Err(Error::InvalidId)));
    }
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_delete_user() {
    let (services, _store, _images) = services();
    let (user, remember) = create_user(&services, "gina@example.com", "password123").await;

    services.user.delete(user.id).await.unwrap();
    assert!(matches!(
        services.user.by_remember(&remember).await,
        Err(Error::NotFound)
    ));
}

#[test]
fn test_token_decodes_and_hashes_deterministically() {
    let token = generate_token(32).expect("Failed to generate token");
    let decoded = URL_SAFE.decode(&token).expect("Token should be base64-URL");
    assert_eq!(decoded.len(), 32);

    let hasher = KeyedHasher::new(HMAC_KEY);
    assert_eq!(hasher.hash(&token), hasher.hash(&token));
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let (services, store, _images) = services();
    create_user(&services, "henry@example.com", "password123").await;

    let mut dup = User::new("Other", "Henry@Example.com", "password456");
    assert!(matches!(
        services.user.create(&mut dup).await,
        Err(Error::EmailTaken)
    ));
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_changing_pepper_invalidates_passwords() {
    let images = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let original = Services::new(store.clone(), &auth_config(), images.path());
    create_user(&original, "ivy@example.com", "password123").await;

    let repeppered = AuthConfig {
        pepper: "rotated-pepper".to_string(),
        ..auth_config()
    };
    let rotated = Services::new(store, &repeppered, images.path());
    assert!(matches!(
        rotated.user.authenticate("ivy@example.com", "password123").await,
        Err(Error::PasswordIncorrect)
    ));
}

#[tokio::test]
async fn test_passwords_sharing_a_long_prefix_do_not_collide() {
    let (services, store, _images) = services();
    let prefix = "a".repeat(72);

    let mut user = User::new("Long", "kim@example.com", format!("{}REAL-SUFFIX", prefix));
    assert!(matches!(
        services.user.create(&mut user).await,
        Err(Error::PasswordTooLong)
    ));
    assert_eq!(store.user_count().await, 0);

    // Longest password that still fits next to the 18-byte pepper
    let longest = "a".repeat(72 - auth_config().pepper.len());
    create_user(&services, "kim@example.com", &longest).await;
    assert!(services
        .user
        .authenticate("kim@example.com", &longest)
        .await
        .is_ok());
    assert!(matches!(
        services
            .user
            .authenticate("kim@example.com", &format!("{}WRONG", longest))
            .await,
        Err(Error::PasswordIncorrect)
    ));
}

#[tokio::test]
async fn test_gallery_owner_must_exist() {
    let (services, store, _images) = services();

    let mut gallery = Gallery::new(424242, "Holiday");
    let err = services.gallery.create(&mut gallery).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(store.gallery_count().await, 0);

    let token = OAuthToken::default();
    assert!(services.oauth.connect(424242, OAUTH_DROPBOX, token).await.is_err());
    assert_eq!(store.oauth_count().await, 0);
}

#[tokio::test]
async fn test_deleting_user_removes_owned_records() {
    let (services, store, _images) = services();
    let (user, _) = create_user(&services, "lee@example.com", "password123").await;
    let (other, _) = create_user(&services, "max@example.com", "password123").await;

    services
        .gallery
        .create(&mut Gallery::new(user.id, "Mine"))
        .await
        .unwrap();
    services
        .gallery
        .create(&mut Gallery::new(other.id, "Theirs"))
        .await
        .unwrap();
    services
        .oauth
        .connect(user.id, OAUTH_DROPBOX, OAuthToken::default())
        .await
        .unwrap();
    let reset = services.user.initiate_reset("lee@example.com").await.unwrap();

    services.user.delete(user.id).await.unwrap();

    assert_eq!(store.gallery_count().await, 1);
    assert_eq!(store.oauth_count().await, 0);
    assert!(services.gallery.by_user_id(user.id).await.unwrap().is_empty());
    assert!(matches!(
        services.user.complete_reset(&reset, "new-password").await,
        Err(Error::TokenInvalid)
    ));
}
