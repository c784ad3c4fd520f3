//! End-to-end relay test: two websocket clients against a live router.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use mapboard::config::RelayConfig;
use mapboard::message::{ClientMessage, ServerMessage};
use mapboard::model::Participant;
use mapboard::relay::{RelayState, app};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_relay() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(RelayState::new(RelayConfig::default()))).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

async fn send(client: &mut Client, message: &ClientMessage) {
    client.send(Message::Text(message.to_text().unwrap().into())).await.unwrap();
}

async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = frame {
            return ServerMessage::from_text(text.as_str()).unwrap();
        }
    }
}

async fn connect(url: &str) -> (Client, String) {
    let (mut client, _) = connect_async(url).await.unwrap();
    let ServerMessage::Session { session_id } = recv(&mut client).await else {
        panic!("expected session event first");
    };
    (client, session_id)
}

#[tokio::test]
async fn healthz_responds() {
    let url = start_relay().await;
    let http = url.replace("ws://", "http://").replace("/ws", "/healthz");
    let status = reqwest::get(http).await.unwrap().status();
    assert!(status.is_success());
}

#[tokio::test]
async fn presence_roundtrip() {
    let url = start_relay().await;
    let (mut alice, alice_sid) = connect(&url).await;
    let (mut bob, bob_sid) = connect(&url).await;
    assert_ne!(alice_sid, bob_sid);

    send(&mut alice, &ClientMessage::join("board-1", Participant::new("alice", "AL"))).await;
    let ServerMessage::UserList { participants } = recv(&mut alice).await else {
        panic!("expected user_list");
    };
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].session_id.as_deref(), Some(alice_sid.as_str()));

    send(&mut bob, &ClientMessage::join("board-1", Participant::new("bob", "BO"))).await;
    let joined = recv(&mut alice).await;
    assert!(matches!(&joined, ServerMessage::UserJoined { session_id, .. } if *session_id == bob_sid));
    let ServerMessage::UserList { participants } = recv(&mut alice).await else {
        panic!("expected user_list after join");
    };
    assert_eq!(participants.len(), 2);
    assert!(matches!(recv(&mut bob).await, ServerMessage::UserList { participants } if participants.len() == 2));

    send(&mut bob, &ClientMessage::Cursor { lng: -73.98, lat: 40.75 }).await;
    let ServerMessage::Cursor(sample) = recv(&mut alice).await else {
        panic!("expected cursor");
    };
    assert_eq!(sample.session_id, bob_sid);
    assert_eq!(sample.position(), [-73.98, 40.75]);
    assert_eq!(sample.participant.map(|p| p.initials), Some("BO".to_owned()));
    assert!(sample.color.is_some());

    bob.close(None).await.unwrap();
    let left = recv(&mut alice).await;
    assert!(matches!(&left, ServerMessage::UserLeft { session_id, .. } if *session_id == bob_sid));
    assert!(matches!(recv(&mut alice).await, ServerMessage::UserList { participants } if participants.len() == 1));
}

#[tokio::test]
async fn empty_board_id_is_rejected() {
    let url = start_relay().await;
    let (mut client, _) = connect(&url).await;
    send(&mut client, &ClientMessage::join("", Participant::new("x", "XX"))).await;
    let ServerMessage::Error { code, message } = recv(&mut client).await else {
        panic!("expected error");
    };
    assert_eq!(code, "E_BOARD_ID_REQUIRED");
    assert_eq!(message, "boardId required");
}
