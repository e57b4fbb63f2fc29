//! Chat room against an in-memory server link.

mod common;

use std::time::Duration;

use serde_json::json;
use tokio::time::{timeout, Instant};

use common::{emitted, remote, FakeApi, Harness};
use syncspace_collab::{events, ChatRoom, Scope, UiEvent};
use syncspace_core::ChatMessage;

fn ws() -> Scope {
    Scope::Workspace("w1".into())
}

fn new_message(user_id: &str, username: &str, text: &str) -> syncspace_collab::Envelope {
    remote(
        events::NEW_MESSAGE,
        ws(),
        json!({"user_id": user_id, "username": username, "message": text}),
    )
}

#[tokio::test(start_paused = true)]
async fn test_history_loaded_on_open() {
    let api = FakeApi::with(|s| {
        s.history = vec![ChatMessage {
            user_id: "u-bob".into(),
            username: "Bob".into(),
            message: "earlier".into(),
            ..ChatMessage::default()
        }];
    });
    let mut h = Harness::new(api);
    let _peer = h.connect().await;

    let room = ChatRoom::open(h.ctx.clone(), "w1").await;
    assert_eq!(room.messages().len(), 1);
    assert!(matches!(
        h.drain_ui().as_slice(),
        [UiEvent::ChatLoaded { messages }] if messages.len() == 1
    ));
}

#[tokio::test(start_paused = true)]
async fn test_send_is_optimistic_and_broadcast() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let mut peer = h.connect().await;
    let mut room = ChatRoom::open(h.ctx.clone(), "w1").await;
    h.drain_ui();

    assert!(room.send("  hello team  ").await);
    assert_eq!(room.messages().len(), 1);
    assert_eq!(room.messages()[0].message, "hello team");

    let sent = peer.recv().await.unwrap();
    assert_eq!(sent.event, events::CHAT_MESSAGE);
    assert_eq!(sent.payload["message"], "hello team");
    assert_eq!(sent.payload["workspace_id"], "w1");

    assert!(matches!(
        h.drain_ui().as_slice(),
        [UiEvent::ChatAppended { own: true, .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_blank_message_is_ignored() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let mut peer = h.connect().await;
    let mut room = ChatRoom::open(h.ctx.clone(), "w1").await;

    assert!(!room.send("   ").await);
    assert!(room.messages().is_empty());
    assert!(emitted(&mut peer).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_own_echo_is_not_appended_twice() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let peer = h.connect().await;
    let mut room = ChatRoom::open(h.ctx.clone(), "w1").await;

    room.send("mine").await;
    peer.send(new_message("u-alice", "Alice", "mine")).await;
    peer.send(new_message("u-bob", "Bob", "theirs")).await;

    assert!(room.step().await);
    assert!(room.step().await);

    let texts: Vec<&str> = room.messages().iter().map(|m| m.message.as_str()).collect();
    assert_eq!(texts, vec!["mine", "theirs"]);
}

#[tokio::test(start_paused = true)]
async fn test_count_equals_sends_plus_foreign_messages() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let peer = h.connect().await;
    let mut room = ChatRoom::open(h.ctx.clone(), "w1").await;

    let mut expected = 0;
    for i in 0..12 {
        match i % 3 {
            0 => {
                room.send(&format!("local {i}")).await;
                expected += 1;
            }
            1 => {
                peer.send(new_message("u-bob", "Bob", &format!("remote {i}"))).await;
                room.step().await;
                expected += 1;
            }
            _ => {
                peer.send(new_message("u-alice", "Alice", &format!("echo {i}"))).await;
                room.step().await;
            }
        }
    }
    assert_eq!(room.messages().len(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_other_workspace_traffic_is_not_routed() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let peer = h.connect().await;
    let mut room = ChatRoom::open(h.ctx.clone(), "w1").await;

    let mut stray = new_message("u-bob", "Bob", "wrong room");
    stray.scope = Scope::Workspace("w2".into());
    peer.send(stray).await;

    let res = timeout(Duration::from_millis(100), room.step()).await;
    assert!(res.is_err());
    assert!(room.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_typing_start_once_and_stop_after_idle() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let mut peer = h.connect().await;
    let mut room = ChatRoom::open(h.ctx.clone(), "w1").await;

    for _ in 0..5 {
        room.input().await;
        tokio::time::advance(Duration::from_millis(300)).await;
    }
    room.input().await;
    let last_input = Instant::now();
    assert_eq!(emitted(&mut peer), vec![events::TYPING_START]);

    // Nothing else is pending, so the idle timer is the next thing to fire.
    assert!(room.step().await);
    assert_eq!(Instant::now() - last_input, Duration::from_millis(2000));
    assert_eq!(emitted(&mut peer), vec![events::TYPING_STOP]);
    assert!(!room.is_typing());
}

#[tokio::test(start_paused = true)]
async fn test_send_stops_typing() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let mut peer = h.connect().await;
    let mut room = ChatRoom::open(h.ctx.clone(), "w1").await;

    room.input().await;
    room.send("done").await;
    assert_eq!(
        emitted(&mut peer),
        vec![events::TYPING_START, events::CHAT_MESSAGE, events::TYPING_STOP]
    );

    let res = timeout(Duration::from_secs(5), room.step()).await;
    assert!(res.is_err(), "no second typing_stop");
}

#[tokio::test(start_paused = true)]
async fn test_remote_typing_indicator_and_ttl() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let peer = h.connect().await;
    let mut room = ChatRoom::open(h.ctx.clone(), "w1").await;
    h.drain_ui();

    peer.send(remote(events::USER_TYPING, ws(), json!({"username": "Bob", "typing": true})))
        .await;
    room.step().await;
    assert_eq!(room.typing_users(), vec!["Bob"]);

    // Bob vanishes without a typing_stop; the flag lapses on its own.
    room.step().await;
    assert!(room.typing_users().is_empty());

    let typing: Vec<bool> = h
        .drain_ui()
        .into_iter()
        .filter_map(|e| match e {
            UiEvent::TypingIndicator { typing, .. } => Some(typing),
            _ => None,
        })
        .collect();
    assert_eq!(typing, vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_close_unregisters_handlers() {
    let mut h = Harness::new(FakeApi::with(|_| {}));
    let _peer = h.connect().await;
    let router = h.ctx.connection.router().clone();

    let room = ChatRoom::open(h.ctx.clone(), "w1").await;
    assert_eq!(router.handler_count(events::NEW_MESSAGE, &ws()), 1);
    room.close().await;
    assert_eq!(router.total_handlers(), 0);
}
