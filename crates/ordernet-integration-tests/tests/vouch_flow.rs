//! Integration test: join request → vouches → threshold → key exchange.
//!
//! Bob asks into #general (threshold 2). Alice aggregates: her own vouch
//! and carol's arrive over the vouch protocol, the second one crosses the
//! threshold, and the approval answers with a key-exchange unicast that
//! hands bob the group key.

use ordernet_integration_tests::{expect_event, settle, spawn_node};
use ordernet_transport::memory::MemoryHub;
use ordernet_types::events::NodeEvent;
use ordernet_types::trust::JoinRequestStatus;

#[tokio::test]
async fn vouch_threshold_triggers_key_exchange() {
    let hub = MemoryHub::new();
    let (alice, mut alice_events) = spawn_node(&hub, "alice", "alice").await;
    let (bob, mut bob_events) = spawn_node(&hub, "bob", "bob").await;
    let (carol, _carol_events) = spawn_node(&hub, "carol", "carol").await;

    alice.create_channel("#general", Some(2)).await.expect("create");
    settle().await;

    // Everyone announces so alice can map bob's key to his transport id.
    alice.announce_presence().await.expect("announce");
    bob.announce_presence().await.expect("announce");
    carol.announce_presence().await.expect("announce");
    settle().await;

    let bob_hex = bob.identity().await.public_key_hex();

    // Bob knocks.
    bob.request_join("alice", "general").await.expect("request");
    let event = expect_event(&mut alice_events, "join request", |e| {
        matches!(e, NodeEvent::JoinRequest { .. })
    })
    .await;
    let NodeEvent::JoinRequest {
        requester,
        nickname,
        channel_id,
    } = event
    else {
        unreachable!()
    };
    assert_eq!(requester, bob_hex);
    assert_eq!(nickname, "bob");
    assert_eq!(channel_id, "general");

    // First vouch: recorded, below threshold.
    alice.vouch_for("alice", &bob_hex, "general").await.expect("vouch");
    expect_event(&mut alice_events, "first vouch", |e| {
        matches!(e, NodeEvent::VouchReceived { .. })
    })
    .await;

    // Second vouch crosses the threshold.
    carol.vouch_for("alice", &bob_hex, "general").await.expect("vouch");
    expect_event(&mut alice_events, "approval", |e| {
        matches!(e, NodeEvent::ChannelJoined { channel_id } if channel_id == "general")
    })
    .await;

    // The approval's key exchange reaches bob, who joins the channel.
    let event = expect_event(&mut bob_events, "key delivery", |e| {
        matches!(e, NodeEvent::KeyReceived { .. })
    })
    .await;
    let NodeEvent::KeyReceived { channel_id } = event else {
        unreachable!()
    };
    assert_eq!(channel_id, "general");

    let alice_key = alice
        .channels()
        .await
        .into_iter()
        .find(|c| c.config.id == "general")
        .expect("alice's channel")
        .group_key;
    let bob_state = bob
        .channels()
        .await
        .into_iter()
        .find(|c| c.config.id == "general")
        .expect("bob joined");
    assert_eq!(bob_state.group_key, alice_key);
    assert_eq!(
        bob_state.config.creator_pub_key,
        alice.identity().await.public_key,
        "reconstructed config names the sender as creator"
    );

    // The request is durably approved with both vouches counted.
    let requests = alice.join_requests("general").await.expect("requests");
    let request = requests
        .iter()
        .find(|r| hex::encode(r.requester_pub_key) == bob_hex)
        .expect("bob's request");
    assert_eq!(request.status, JoinRequestStatus::Approved);
    assert_eq!(request.vouches_received, 2);

    // Two directional edges in the trust graph, both pointing at bob.
    let graph = alice.trust_graph("general").await.expect("graph");
    assert_eq!(graph.len(), 2);
    assert!(graph.iter().all(|(_, vouchee)| *vouchee == bob_hex));

    alice.stop().await;
    bob.stop().await;
    carol.stop().await;
}

#[tokio::test]
async fn duplicate_vouches_count_once() {
    let hub = MemoryHub::new();
    let (alice, mut alice_events) = spawn_node(&hub, "alice", "alice").await;
    let (bob, _bob_events) = spawn_node(&hub, "bob", "bob").await;
    let (carol, _carol_events) = spawn_node(&hub, "carol", "carol").await;

    // Threshold 2 so one repeated voucher can never cross it.
    alice.create_channel("#general", Some(2)).await.expect("create");
    settle().await;

    let bob_hex = bob.identity().await.public_key_hex();
    bob.request_join("alice", "general").await.expect("request");

    carol.vouch_for("alice", &bob_hex, "general").await.expect("vouch");
    expect_event(&mut alice_events, "vouch", |e| {
        matches!(e, NodeEvent::VouchReceived { .. })
    })
    .await;
    carol.vouch_for("alice", &bob_hex, "general").await.expect("again");
    expect_event(&mut alice_events, "repeat vouch", |e| {
        matches!(e, NodeEvent::VouchReceived { .. })
    })
    .await;
    settle().await;

    let graph = alice.trust_graph("general").await.expect("graph");
    assert_eq!(graph.len(), 1, "one edge per (voucher, vouchee, channel)");

    let requests = alice.join_requests("general").await.expect("requests");
    let request = requests
        .iter()
        .find(|r| hex::encode(r.requester_pub_key) == bob_hex)
        .expect("bob's request");
    assert_eq!(request.vouches_received, 1);
    assert_eq!(request.status, JoinRequestStatus::Pending);

    alice.stop().await;
    bob.stop().await;
    carol.stop().await;
}
