//! Integration test: restart persistence.
//!
//! One database file, two node lifetimes: the identity, both channels, and
//! the full message history must come back exactly.

use ordernet_node::{Node, NodeConfig, NodeError};
use ordernet_transport::memory::MemoryHub;

async fn start_node(db_path: &std::path::Path, passphrase: Option<&str>) -> Result<Node, NodeError> {
    let hub = MemoryHub::new();
    let (transport, incoming) = hub.attach("solo").await;
    let config = NodeConfig {
        nickname: Some("alice".into()),
        db_path: Some(db_path.to_path_buf()),
        passphrase: passphrase.map(str::to_string),
        ..NodeConfig::default()
    };
    Node::start(config, transport, incoming).await
}

#[tokio::test]
async fn identity_channels_and_history_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("ordernet.db");

    // First lifetime: identity, two channels, ten messages.
    let node = start_node(&db_path, Some("hunter2")).await.expect("first start");
    let identity = node.identity().await;

    node.create_channel("#general", None).await.expect("create");
    let team = node
        .create_private_channel("#team", &[], Some(3))
        .await
        .expect("create");
    for i in 0..10 {
        node.send_message("general", &format!("message {i}"))
            .await
            .expect("send")
            .expect("allowed");
    }
    node.stop().await;

    // Second lifetime, same database and passphrase.
    let node = start_node(&db_path, Some("hunter2")).await.expect("restart");
    let reloaded = node.identity().await;
    assert_eq!(reloaded.public_key, identity.public_key);
    assert_eq!(reloaded.nickname, "alice");

    let channels = node.channels().await;
    assert_eq!(channels.len(), 2);
    let general = channels
        .iter()
        .find(|c| c.config.id == "general")
        .expect("general restored");
    let team_restored = channels
        .iter()
        .find(|c| c.config.id == "team")
        .expect("team restored");
    assert_eq!(team_restored.group_key, team.group_key);
    assert_eq!(team_restored.config.vouch_threshold, 3);
    assert!(team_restored.config.invite_only);

    let history = node
        .channel_history("general", 50)
        .await
        .expect("history");
    assert_eq!(history.len(), 10);
    for (i, message) in history.iter().enumerate() {
        assert_eq!(message.content, format!("message {i}"));
        assert_eq!(message.sender_nick, "alice");
        assert_eq!(message.channel_id, "general");
    }
    assert_eq!(general.config.id, "general");

    node.stop().await;
}

#[tokio::test]
async fn wrong_passphrase_is_fatal_at_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("ordernet.db");

    let node = start_node(&db_path, Some("correct horse")).await.expect("first start");
    node.stop().await;

    let result = start_node(&db_path, Some("battery staple")).await;
    assert!(matches!(result, Err(NodeError::IdentityLocked)));

    // The right passphrase still works afterwards.
    let node = start_node(&db_path, Some("correct horse")).await.expect("unlock");
    node.stop().await;
}

#[tokio::test]
async fn default_passphrase_applies_when_unset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("ordernet.db");

    let node = start_node(&db_path, None).await.expect("first start");
    let identity = node.identity().await;
    node.stop().await;

    let node = start_node(&db_path, None).await.expect("restart");
    assert_eq!(node.identity().await.public_key, identity.public_key);
    node.stop().await;
}

#[tokio::test]
async fn stop_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("ordernet.db");

    let node = start_node(&db_path, None).await.expect("start");
    node.stop().await;
    node.stop().await;

    // Operations after stop fail cleanly instead of touching a closed store.
    assert!(matches!(
        node.create_channel("#late", None).await,
        Err(NodeError::Stopped)
    ));
}
