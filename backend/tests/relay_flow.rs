use backend::{serve, RelayState};
use futures::{SinkExt, StreamExt};
use http::Uri;
use shared::{ClientMessage, MovePayload, RoomCode, ServerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use websocket::{ClientBuilder, MaybeTlsStream, Message, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay(rejoin_grace: Duration) -> (SocketAddr, RelayState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = RelayState::new(rejoin_grace);
    tokio::spawn(serve(listener, state.clone()));
    (addr, state)
}

async fn connect(addr: SocketAddr) -> Client {
    let uri: Uri = format!("ws://{}/ws", addr).parse().unwrap();
    let builder = ClientBuilder::from_uri(uri);
    let (client, _) = builder.connect().await.unwrap();
    client
}

async fn send(client: &mut Client, message: ClientMessage) {
    client
        .send(Message::text(message.encode().unwrap()))
        .await
        .unwrap();
}

async fn receive(client: &mut Client) -> ServerMessage {
    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("no frame within 5s")
        .expect("stream ended")
        .expect("socket error");
    ServerMessage::decode(frame.as_text().expect("text frame")).unwrap()
}

#[tokio::test]
async fn test_two_players_start_and_relay_moves() {
    let (addr, _state) = start_relay(Duration::from_secs(10)).await;
    let code = RoomCode::generate();
    let join = ClientMessage::JoinGame {
        code: code.as_str().to_string(),
    };

    let mut host = connect(addr).await;
    send(&mut host, join.clone()).await;
    let mut guest = connect(addr).await;
    send(&mut guest, join).await;

    assert_eq!(receive(&mut host).await, ServerMessage::StartGame);
    assert_eq!(receive(&mut guest).await, ServerMessage::StartGame);

    let opening = MovePayload::new("e2", "e4", None);
    send(&mut host, ClientMessage::Move(opening.clone())).await;
    assert_eq!(receive(&mut guest).await, ServerMessage::NewMove(opening));

    let answer = MovePayload::new("c7", "c5", None);
    send(&mut guest, ClientMessage::Move(answer.clone())).await;
    assert_eq!(receive(&mut host).await, ServerMessage::NewMove(answer));
}

#[tokio::test]
async fn test_full_room_and_disconnect() {
    let (addr, state) = start_relay(Duration::from_millis(50)).await;
    let code = RoomCode::generate();
    let join = ClientMessage::JoinGame {
        code: code.as_str().to_string(),
    };

    let mut host = connect(addr).await;
    send(&mut host, join.clone()).await;
    let mut guest = connect(addr).await;
    send(&mut guest, join.clone()).await;
    assert_eq!(receive(&mut host).await, ServerMessage::StartGame);
    assert_eq!(receive(&mut guest).await, ServerMessage::StartGame);

    let mut late = connect(addr).await;
    send(&mut late, join).await;
    assert_eq!(
        receive(&mut late).await,
        ServerMessage::Error {
            message: "Room is full".to_string()
        }
    );

    guest.close().await.unwrap();
    assert_eq!(receive(&mut host).await, ServerMessage::OpponentDisconnected);
    assert_eq!(state.room_count(), 0);
}

#[tokio::test]
async fn test_dropped_player_rejoins_the_same_game() {
    //! The seat stays open while the client reconnects, and a move sent in
    //! the meantime is delivered after the rejoin
    let (addr, state) = start_relay(Duration::from_secs(10)).await;
    let code = RoomCode::generate();
    let join = ClientMessage::JoinGame {
        code: code.as_str().to_string(),
    };

    let mut host = connect(addr).await;
    send(&mut host, join.clone()).await;
    let mut guest = connect(addr).await;
    send(&mut guest, join.clone()).await;
    assert_eq!(receive(&mut host).await, ServerMessage::StartGame);
    assert_eq!(receive(&mut guest).await, ServerMessage::StartGame);

    guest.close().await.unwrap();
    drop(guest);
    // Wait until the relay has seen the drop before moving
    tokio::time::sleep(Duration::from_millis(100)).await;
    let opening = MovePayload::new("e2", "e4", None);
    send(&mut host, ClientMessage::Move(opening.clone())).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut rejoined = connect(addr).await;
    send(&mut rejoined, join).await;
    assert_eq!(receive(&mut rejoined).await, ServerMessage::StartGame);
    assert_eq!(receive(&mut rejoined).await, ServerMessage::NewMove(opening));
    assert_eq!(receive(&mut host).await, ServerMessage::StartGame);
    assert_eq!(state.room_count(), 1);

    let answer = MovePayload::new("c7", "c5", None);
    send(&mut rejoined, ClientMessage::Move(answer.clone())).await;
    assert_eq!(receive(&mut host).await, ServerMessage::NewMove(answer));
}
