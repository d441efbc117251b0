// End-to-end tests over a real WebSocket connection

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::fs;
use std::time::Duration;
use syllable_bot::logging::RecordingLog;
use syllable_bot::server::BotServer;
use syllable_bot::*;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn next_json(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("read error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

#[tokio::test]
async fn test_server_plays_a_turn_and_saves_on_shutdown() {
    let dir = std::env::temp_dir().join(format!("syllable_bot_server_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("en.txt"), "cat\ncats\n").unwrap();

    let log = RecordingLog::new();
    let dictionary = Dictionary::new(&dir, log.clone());
    let mut solver = Solver::with_seed(3, log.clone());
    solver.set_strategy(Strategy::Longest);
    let config = BotConfig {
        typing_delay: DelayRange::new(0.0, 0.0),
        start_delay: DelayRange::new(0.0, 0.0),
        ..BotConfig::default()
    };
    let session = Session::new(dictionary, solver, config, log.clone()).with_seed(3);

    let server = BotServer::bind("127.0.0.1:0", session, log.clone())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let running = tokio::spawn(server.run(async {
        let _ = stop_rx.await;
    }));

    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    send_json(
        &mut ws,
        json!({
            "event": "setup",
            "data": {"selfPeerId": 7, "milestone": {"dictionaryManifest": {"name": "English"}}}
        }),
    )
    .await;

    let initial = next_json(&mut ws).await;
    assert_eq!(initial["event"], "initialConfig");
    assert_eq!(initial["data"]["active"], true);
    assert_eq!(initial["data"]["autojoin"], false);

    send_json(&mut ws, json!({"event": "nextTurn", "data": [7, "at"]})).await;
    let mut typed = Vec::new();
    let submitted = loop {
        let frame = next_json(&mut ws).await;
        match frame["action"].as_str() {
            Some("teclear_texto") => typed.push(frame["text"].as_str().unwrap().to_string()),
            Some("escribir_palabra") => break frame["word"].as_str().unwrap().to_string(),
            other => panic!("unexpected frame {other:?}: {frame}"),
        }
    };
    assert_eq!(typed, vec!["c", "ca", "cat", "cats"]);
    assert_eq!(submitted, "cats");

    // Another player's word is learned and written out on shutdown.
    send_json(&mut ws, json!({"event": "setPlayerWord", "data": [8, "bat"]})).await;
    send_json(&mut ws, json!({"event": "correctWord", "data": [8]})).await;
    ws.close(None).await.unwrap();
    // The server answers our close only after handling the frames before it.
    while let Some(Ok(_)) = ws.next().await {}

    stop_tx.send(()).unwrap();
    let session = running.await.unwrap().unwrap();
    assert_eq!(session.phase(), Phase::AwaitingIdentity);
    assert!(session.dictionary().contains("bat"));
    assert_eq!(
        load_words_from_file(dir.join("en.txt")).unwrap(),
        vec!["bat", "cat", "cats"]
    );

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_bind_reports_address_in_use() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let log = RecordingLog::new();
    let dictionary = Dictionary::new(std::env::temp_dir(), log.clone());
    let session = Session::new(dictionary, Solver::new(log.clone()), BotConfig::default(), log.clone());
    let result = BotServer::bind(&addr.to_string(), session, log).await;
    assert!(result.is_err());
}
