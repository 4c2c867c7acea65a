//! Integration tests for the in-memory channel backend.

use voxroom_backend::{
    BackendError, BackendOp, ChannelBackend, ChannelEdit, ChannelSpec, MemoryBackend,
    PermissionOverride, PermissionTarget, UserLimit, VoiceState,
};
use voxroom_protocol::{ChannelId, TransitionEvent, UserId};

// =========================================================================
// Helpers
// =========================================================================

fn uid(n: u64) -> UserId {
    UserId(n)
}

fn spec(name: &str, limit: UserLimit) -> ChannelSpec {
    ChannelSpec {
        name: name.into(),
        parent: None,
        limit,
        bitrate_kbps: None,
        permissions: Vec::new(),
    }
}

async fn channel(backend: &MemoryBackend, name: &str) -> ChannelId {
    backend
        .create_channel(spec(name, UserLimit::Unlimited))
        .await
        .unwrap()
}

// =========================================================================
// Channels
// =========================================================================

#[tokio::test]
async fn test_create_channel_applies_permissions_and_skips_inherit() {
    let backend = MemoryBackend::new();
    let id = backend
        .create_channel(ChannelSpec {
            name: "room".into(),
            parent: None,
            limit: UserLimit::Max(4),
            bitrate_kbps: Some(32),
            permissions: vec![
                (PermissionTarget::Everyone, PermissionOverride::ALLOW_CONNECT),
                (PermissionTarget::User(uid(1)), PermissionOverride::MANAGER),
                (PermissionTarget::User(uid(2)), PermissionOverride::INHERIT),
            ],
        })
        .await
        .unwrap();

    let record = backend.channel(id).await.unwrap();
    assert_eq!(record.limit, UserLimit::Max(4));
    assert_eq!(record.bitrate_kbps, 32);
    assert_eq!(record.overrides.len(), 2);
    assert!(record.allows_manage(uid(1)));
    assert!(!record.allows_manage(uid(2)));
}

#[tokio::test]
async fn test_edit_channel_changes_only_given_fields() {
    let backend = MemoryBackend::new();
    let id = channel(&backend, "before").await;

    backend
        .edit_channel(
            id,
            ChannelEdit {
                name: Some("after".into()),
                ..ChannelEdit::default()
            },
        )
        .await
        .unwrap();

    let record = backend.channel(id).await.unwrap();
    assert_eq!(record.name, "after");
    assert_eq!(record.limit, UserLimit::Unlimited);
}

#[tokio::test]
async fn test_edit_unknown_channel_returns_error() {
    let backend = MemoryBackend::new();
    let err = backend
        .edit_channel(ChannelId(99), ChannelEdit::default())
        .await
        .unwrap_err();
    assert_eq!(err, BackendError::UnknownChannel(ChannelId(99)));
}

#[tokio::test]
async fn test_set_permission_inherit_removes_override() {
    let backend = MemoryBackend::new();
    let id = channel(&backend, "room").await;
    let target = PermissionTarget::User(uid(3));

    backend
        .set_permission(id, target, PermissionOverride::DENY_CONNECT)
        .await
        .unwrap();
    assert!(backend.channel(id).await.unwrap().override_for(target).is_some());

    backend
        .set_permission(id, target, PermissionOverride::INHERIT)
        .await
        .unwrap();
    assert!(backend.channel(id).await.unwrap().override_for(target).is_none());
}

#[tokio::test]
async fn test_delete_channel_disconnects_occupants() {
    let backend = MemoryBackend::new();
    let id = channel(&backend, "room").await;
    backend.connect(uid(1), Some(id)).await.unwrap();
    backend.take_events().await;

    backend.delete_channel(id).await.unwrap();

    assert_eq!(backend.location(uid(1)).await, None);
    assert_eq!(
        backend.take_events().await,
        vec![TransitionEvent::new(uid(1), Some(id), None)]
    );
    assert!(backend.delete_channel(id).await.is_err());
}

#[tokio::test]
async fn test_find_channel_matches_name_and_parent() {
    let backend = MemoryBackend::new();
    let group = backend.ensure_group("Voice").await.unwrap();
    let id = backend
        .create_channel(ChannelSpec {
            parent: Some(group),
            ..spec("spawn", UserLimit::Unlimited)
        })
        .await
        .unwrap();

    assert_eq!(backend.find_channel("spawn", Some(group)).await.unwrap(), Some(id));
    assert_eq!(backend.find_channel("spawn", None).await.unwrap(), None);
    assert_eq!(backend.ensure_group("Voice").await.unwrap(), group);
}

// =========================================================================
// Users
// =========================================================================

#[tokio::test]
async fn test_connect_denied_by_permission() {
    let backend = MemoryBackend::new();
    let id = channel(&backend, "room").await;
    backend
        .set_permission(id, PermissionTarget::Everyone, PermissionOverride::DENY_CONNECT)
        .await
        .unwrap();

    let err = backend.connect(uid(1), Some(id)).await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected(_)));
    assert_eq!(backend.location(uid(1)).await, None);
}

#[tokio::test]
async fn test_connect_denied_when_full() {
    let backend = MemoryBackend::new();
    let id = backend
        .create_channel(spec("duo", UserLimit::Max(2)))
        .await
        .unwrap();

    backend.connect(uid(1), Some(id)).await.unwrap();
    backend.connect(uid(2), Some(id)).await.unwrap();
    assert!(backend.connect(uid(3), Some(id)).await.is_err());
}

#[tokio::test]
async fn test_move_user_bypasses_limit_and_records_event() {
    let backend = MemoryBackend::new();
    let a = channel(&backend, "a").await;
    let b = backend
        .create_channel(spec("b", UserLimit::Max(1)))
        .await
        .unwrap();
    backend.connect(uid(1), Some(b)).await.unwrap();
    backend.connect(uid(2), Some(a)).await.unwrap();
    backend.take_events().await;

    backend.move_user(uid(2), Some(b)).await.unwrap();

    assert_eq!(backend.location(uid(2)).await, Some(b));
    assert_eq!(
        backend.take_events().await,
        vec![TransitionEvent::new(uid(2), Some(a), Some(b))]
    );
}

#[tokio::test]
async fn test_move_user_not_in_voice_is_rejected() {
    let backend = MemoryBackend::new();
    let id = channel(&backend, "room").await;
    let err = backend.move_user(uid(1), Some(id)).await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected(_)));
}

#[tokio::test]
async fn test_voice_state_mute_and_unmute() {
    let backend = MemoryBackend::new();
    let id = channel(&backend, "room").await;
    backend.connect(uid(1), Some(id)).await.unwrap();

    backend
        .set_voice_state(uid(1), VoiceState { muted: Some(true) })
        .await
        .unwrap();
    assert!(backend.is_muted(uid(1)).await);

    backend
        .set_voice_state(uid(1), VoiceState { muted: Some(false) })
        .await
        .unwrap();
    assert!(!backend.is_muted(uid(1)).await);
}

#[tokio::test]
async fn test_current_occupants() {
    let backend = MemoryBackend::new();
    let id = channel(&backend, "room").await;
    backend.connect(uid(1), Some(id)).await.unwrap();
    backend.connect(uid(2), Some(id)).await.unwrap();
    backend.connect(uid(2), None).await.unwrap();

    let occupants = backend.current_occupants(id).await.unwrap();
    assert_eq!(occupants.len(), 1);
    assert!(occupants.contains(&uid(1)));
}

#[tokio::test]
async fn test_display_name_unknown_user() {
    let backend = MemoryBackend::new();
    backend.register_user(uid(1), "alice").await;

    assert_eq!(backend.display_name(uid(1)).await.unwrap(), "alice");
    assert_eq!(
        backend.display_name(uid(2)).await.unwrap_err(),
        BackendError::UnknownUser(uid(2))
    );
}

#[tokio::test]
async fn test_fail_next_with_custom_error_is_queued_per_op() {
    let backend = MemoryBackend::new();
    let id = channel(&backend, "room").await;
    backend
        .fail_next_with(BackendOp::DeleteChannel, BackendError::Rejected("nope".into()))
        .await;

    // Other operations are unaffected.
    assert!(backend.current_occupants(id).await.is_ok());
    assert_eq!(
        backend.delete_channel(id).await.unwrap_err(),
        BackendError::Rejected("nope".into())
    );
    assert!(backend.delete_channel(id).await.is_ok());
    assert_eq!(backend.calls(BackendOp::DeleteChannel).await, 2);
}
