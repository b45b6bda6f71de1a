//! Adapter server end to end: real TCP clients, the game-loop bridge pumped by the test

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout, Instant};

use merge_drop::adapter::{
    run_server, AdapterStatus, Bridge, InboundCommand, OutboundMessage, ServerConfig,
};
use merge_drop::engine::{EngineConfig, GameEngine, GameSnapshot};
use merge_drop::types::Lifecycle;

struct Game {
    bridge: Bridge,
    engine: GameEngine,
    snap: GameSnapshot,
    status: Arc<AdapterStatus>,
    addr: SocketAddr,
}

impl Game {
    async fn start(max_pending_commands: usize) -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_pending_commands,
            log_path: None,
        };
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending_commands);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let status = Arc::new(AdapterStatus::default());

        let server_status = Arc::clone(&status);
        tokio::spawn(async move {
            let _ = run_server(config, cmd_tx, out_rx, Some(ready_tx), server_status).await;
        });
        let addr = timeout(Duration::from_secs(2), ready_rx)
            .await
            .expect("server did not signal ready")
            .expect("ready channel dropped");

        Self {
            bridge: Bridge::new(cmd_rx, out_tx),
            engine: GameEngine::new(EngineConfig::headless()),
            snap: GameSnapshot::default(),
            status,
            addr,
        }
    }

    fn pump(&mut self) -> usize {
        self.bridge.pump(&mut self.engine, &mut self.snap)
    }

    async fn wait_for_controller(&self, id: Option<usize>) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.status.controller_id() != id {
            assert!(Instant::now() < deadline, "controller never became {id:?}");
            sleep(Duration::from_millis(5)).await;
        }
    }
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect failed");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn hello(&mut self, seq: u64, stream: bool) -> serde_json::Value {
        let line = format!(
            r#"{{"type":"hello","seq":{seq},"ts":0,"client":{{"name":"e2e","version":"0.1"}},"protocol_version":"1.0.0","requested":{{"stream_observations":{stream}}}}}"#
        );
        self.send(&line).await;
        let welcome = self.recv().await;
        assert_eq!(welcome["type"], "welcome");
        welcome
    }

    /// Next line the server sends without game-loop involvement
    async fn recv(&mut self) -> serde_json::Value {
        let line = timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }

    /// Next line, pumping the game loop while waiting
    async fn recv_pumped(&mut self, game: &mut Game) -> serde_json::Value {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            game.pump();
            assert!(Instant::now() < deadline, "timed out waiting for a line");
            if let Ok(line) = timeout(Duration::from_millis(10), self.lines.next_line()).await {
                let line = line.unwrap().expect("connection closed");
                return serde_json::from_str(&line).unwrap();
            }
        }
    }
}

#[tokio::test]
async fn controller_commands_are_applied_and_acked() {
    let mut game = Game::start(8).await;
    let mut client = Client::connect(game.addr).await;

    let welcome = client.hello(1, false).await;
    assert_eq!(welcome["seq"], 1);
    assert_eq!(welcome["role"], "controller");
    assert_eq!(welcome["protocol_version"], "1.0.0");
    assert_eq!(welcome["game_id"], "merge-drop");
    assert_eq!(welcome["grid"]["width"], 6);
    assert_eq!(welcome["grid"]["height"], 8);

    client
        .send(r#"{"type":"command","seq":2,"ts":0,"actions":[{"action":"start"},{"action":"selectColumn","column":1}]}"#)
        .await;
    let ack = client.recv_pumped(&mut game).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["seq"], 2);
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["applied"], 2);
    assert_eq!(game.engine.lifecycle(), Lifecycle::Playing);

    // Replayed sequence numbers are rejected before reaching the engine.
    client
        .send(r#"{"type":"command","seq":2,"ts":0,"actions":[{"action":"togglePause"}]}"#)
        .await;
    let err = client.recv().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "invalid_command");
    assert_eq!(game.pump(), 0);
    assert_eq!(game.engine.lifecycle(), Lifecycle::Playing);

    // Empty action lists are invalid.
    client
        .send(r#"{"type":"command","seq":3,"ts":0,"actions":[]}"#)
        .await;
    assert_eq!(client.recv().await["code"], "invalid_command");

    // Unknown types and broken JSON are answered with errors too.
    client.send(r#"{"type":"bogus","seq":4}"#).await;
    let err = client.recv().await;
    assert_eq!(err["code"], "invalid_command");
    assert_eq!(err["seq"], 4);
    client.send(r#"{"type":"command","seq":5,"#).await;
    assert_eq!(client.recv().await["code"], "invalid_command");
}

#[tokio::test]
async fn handshake_roles_and_controller_promotion() {
    let mut game = Game::start(8).await;

    let mut first = Client::connect(game.addr).await;
    let mut second = Client::connect(game.addr).await;

    // Commands before hello are refused.
    second
        .send(r#"{"type":"command","seq":1,"ts":0,"actions":[{"action":"start"}]}"#)
        .await;
    assert_eq!(second.recv().await["code"], "handshake_required");

    let welcome = first.hello(1, false).await;
    assert_eq!(welcome["role"], "controller");
    let first_id = welcome["client_id"].as_u64().unwrap() as usize;

    let welcome = second.hello(2, false).await;
    assert_eq!(welcome["role"], "observer");
    assert_eq!(welcome["controller_id"], first_id as u64);
    let second_id = welcome["client_id"].as_u64().unwrap() as usize;
    assert_eq!(game.status.client_count(), 2);

    second
        .send(r#"{"type":"command","seq":3,"ts":0,"actions":[{"action":"start"}]}"#)
        .await;
    assert_eq!(second.recv().await["code"], "not_controller");
    second
        .send(r#"{"type":"control","seq":4,"ts":0,"action":"claim"}"#)
        .await;
    assert_eq!(second.recv().await["code"], "controller_active");

    // Dropping the controller hands control to the remaining client.
    drop(first);
    game.wait_for_controller(Some(second_id)).await;

    second
        .send(r#"{"type":"command","seq":5,"ts":0,"actions":[{"action":"start"}]}"#)
        .await;
    let ack = second.recv_pumped(&mut game).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["applied"], 1);

    // Release, then claim again.
    second
        .send(r#"{"type":"control","seq":6,"ts":0,"action":"release"}"#)
        .await;
    assert_eq!(second.recv().await["type"], "ack");
    game.wait_for_controller(None).await;
    second
        .send(r#"{"type":"control","seq":7,"ts":0,"action":"claim"}"#)
        .await;
    assert_eq!(second.recv().await["type"], "ack");
    game.wait_for_controller(Some(second_id)).await;
}

#[tokio::test]
async fn full_command_queue_reports_backpressure() {
    let mut game = Game::start(1).await;
    let mut client = Client::connect(game.addr).await;
    client.hello(1, false).await;

    // Nothing pumps, so the first command fills the queue.
    client
        .send(r#"{"type":"command","seq":2,"ts":0,"actions":[{"action":"start"}]}"#)
        .await;
    client
        .send(r#"{"type":"command","seq":3,"ts":0,"actions":[{"action":"start"}]}"#)
        .await;
    let err = client.recv().await;
    assert_eq!(err["code"], "backpressure");
    assert_eq!(err["seq"], 3);

    let ack = client.recv_pumped(&mut game).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["seq"], 2);
}

#[tokio::test]
async fn streaming_clients_receive_observations() {
    let mut game = Game::start(8).await;
    let mut client = Client::connect(game.addr).await;
    client.hello(1, true).await;

    let obs = client.recv_pumped(&mut game).await;
    assert_eq!(obs["type"], "observation");
    assert_eq!(obs["lifecycle"], "awaitingStart");
    assert_eq!(obs["playable"], false);
    assert_eq!(obs["grid"]["cells"].as_array().unwrap().len(), 8);
    assert_eq!(obs["grid"]["cells"][0].as_array().unwrap().len(), 6);
    let hash = obs["state_hash"].as_str().unwrap();
    assert_eq!(hash.len(), 16);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn incompatible_protocol_closes_the_connection() {
    let game = Game::start(8).await;
    let mut client = Client::connect(game.addr).await;
    client
        .send(r#"{"type":"hello","seq":1,"ts":0,"client":{"name":"old","version":"0"},"protocol_version":"2.0.0"}"#)
        .await;
    let err = client.recv().await;
    assert_eq!(err["code"], "protocol_mismatch");

    let closed = timeout(Duration::from_secs(2), client.lines.next_line())
        .await
        .expect("server kept the connection open")
        .unwrap();
    assert!(closed.is_none());
}
