use super::*;
use crate::config::RelayConfig;
use crate::model::Participant;

fn state() -> RelayState {
    RelayState::new(RelayConfig { palette: vec!["#111111".into(), "#222222".into()], ..RelayConfig::default() })
}

#[tokio::test]
async fn join_stamps_session_and_color() {
    let state = state();
    let (tx, _rx) = mpsc::channel(4);
    let p = join_room(&state, "b1", "s1", Some(Participant::new("u1", "AB")), tx).await;
    assert_eq!(p.id, "u1");
    assert_eq!(p.session_id.as_deref(), Some("s1"));
    assert_eq!(p.color.as_deref(), Some("#111111"));
    assert_eq!(state.room_count().await, 1);
}

#[tokio::test]
async fn join_without_participant_uses_session_id() {
    let state = state();
    let (tx, _rx) = mpsc::channel(4);
    let p = join_room(&state, "b1", "s1", None, tx).await;
    assert_eq!(p.id, "s1");
    assert_eq!(p.display_initials(), "??");
}

#[tokio::test]
async fn join_keeps_valid_supplied_color() {
    let state = state();
    let (tx, _rx) = mpsc::channel(4);
    let supplied = Participant { color: Some("#ABCDEF".into()), ..Participant::new("u1", "AB") };
    let p = join_room(&state, "b1", "s1", Some(supplied), tx).await;
    assert_eq!(p.color.as_deref(), Some("#abcdef"));
}

#[tokio::test]
async fn colors_are_per_room_and_released_on_leave() {
    let state = state();
    let (tx, _rx) = mpsc::channel(4);
    let a = join_room(&state, "b1", "a", None, tx.clone()).await;
    let b = join_room(&state, "b1", "b", None, tx.clone()).await;
    let other = join_room(&state, "b2", "c", None, tx.clone()).await;
    assert_ne!(a.color, b.color);
    assert_eq!(other.color.as_deref(), Some("#111111"));

    leave_room(&state, "b1", "a").await;
    let d = join_room(&state, "b1", "d", None, tx).await;
    assert_eq!(d.color, a.color);
}

#[tokio::test]
async fn roster_in_join_order() {
    let state = state();
    let (tx, _rx) = mpsc::channel(4);
    for sid in ["x", "y", "z"] {
        join_room(&state, "b1", sid, None, tx.clone()).await;
    }
    let ids: Vec<Option<String>> = roster(&state, "b1").await.into_iter().map(|p| p.session_id).collect();
    assert_eq!(ids, vec![Some("x".into()), Some("y".into()), Some("z".into())]);
    assert!(roster(&state, "nope").await.is_empty());
}

#[tokio::test]
async fn last_leave_evicts_room() {
    let state = state();
    let (tx, _rx) = mpsc::channel(4);
    join_room(&state, "b1", "a", None, tx).await;
    let left = leave_room(&state, "b1", "a").await.unwrap();
    assert_eq!(left.session_id.as_deref(), Some("a"));
    assert_eq!(state.room_count().await, 0);
    assert!(leave_room(&state, "b1", "a").await.is_none());
}

#[tokio::test]
async fn member_lookup() {
    let state = state();
    let (tx, _rx) = mpsc::channel(4);
    join_room(&state, "b1", "a", Some(Participant::new("u", "QQ")), tx).await;
    assert_eq!(member(&state, "b1", "a").await.map(|p| p.initials), Some("QQ".into()));
    assert!(member(&state, "b1", "zz").await.is_none());
    assert!(member(&state, "b9", "a").await.is_none());
}

#[tokio::test]
async fn broadcast_excludes_sender_and_skips_full_queues() {
    let state = state();
    let (tx_a, mut rx_a) = mpsc::channel(4);
    let (tx_b, mut rx_b) = mpsc::channel(1);
    let (tx_c, mut rx_c) = mpsc::channel(4);
    join_room(&state, "b1", "a", None, tx_a).await;
    join_room(&state, "b1", "b", None, tx_b).await;
    join_room(&state, "b1", "c", None, tx_c).await;

    let msg = ServerMessage::UserList { participants: vec![] };
    assert_eq!(broadcast(&state, "b1", &msg, Some("a")).await, 2);
    // b's single-slot queue is now full
    assert_eq!(broadcast(&state, "b1", &msg, Some("a")).await, 1);

    assert!(rx_a.try_recv().is_err());
    assert_eq!(rx_b.try_recv().unwrap(), msg);
    assert!(rx_b.try_recv().is_err());
    assert_eq!(rx_c.try_recv().unwrap(), msg);
    assert_eq!(rx_c.try_recv().unwrap(), msg);
}

#[tokio::test]
async fn broadcast_to_unknown_room_is_noop() {
    let state = state();
    assert_eq!(broadcast(&state, "ghost", &ServerMessage::UserList { participants: vec![] }, None).await, 0);
}
