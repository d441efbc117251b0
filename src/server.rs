//! Loopback WebSocket endpoint for the browser extension.
//!
//! Connections are served one at a time so a single session (and a single
//! writer of the dictionary file) exists per process. Each connection gets
//! a writer task fed by the session's outbound channel.

use crate::debug_log;
use crate::logging::Logger;
use crate::protocol::Outbound;
use crate::session::Session;
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

pub struct BotServer {
    listener: TcpListener,
    session: Session,
    log: Logger,
}

impl BotServer {
    pub async fn bind(addr: &str, session: Session, log: Logger) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind {addr}"))?;
        Ok(Self {
            listener,
            session,
            log,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener.local_addr().context("listener address")
    }

    /// Accepts connections until `shutdown` resolves, then saves the
    /// dictionary and hands the session back.
    pub async fn run<F>(mut self, shutdown: F) -> anyhow::Result<Session>
    where
        F: Future<Output = ()>,
    {
        self.log.info(&format!(
            "[INIT] Listening on ws://{}",
            self.local_addr()?
        ));
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = &mut shutdown => break,
            };
            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    self.log.warn(&format!("[CONN] Accept failed: {e}"));
                    continue;
                }
            };
            self.log
                .info(&format!("[CONN] Client connected from {peer}"));

            let outcome = tokio::select! {
                result = serve_connection(stream, &mut self.session, &self.log) => Some(result),
                _ = &mut shutdown => None,
            };
            match outcome {
                Some(Ok(())) => self
                    .log
                    .info(&format!("[CONN] Client disconnected: {peer}")),
                Some(Err(e)) => self
                    .log
                    .error(&format!("[CONN] Connection error from {peer}: {e:#}")),
                None => {
                    self.session.disconnect();
                    break;
                }
            }
        }

        self.log.info("[STOP] Shutting down");
        self.session.save_dictionary();
        Ok(self.session)
    }
}

async fn serve_connection(
    stream: TcpStream,
    session: &mut Session,
    log: &Logger,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .context("websocket handshake")?;
    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    session.attach(tx);

    let writer_log = log.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    writer_log.error(&format!("[SEND] Could not encode {message:?}: {e}"));
                    continue;
                }
            };
            debug_log!(target: crate::logging::PACKET_TARGET, "[SEND] {text}");
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut result = Ok(());
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => session.handle_text(text.as_str()),
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => session.handle_text(text),
                Err(_) => log.warn("[RECV] Dropped non UTF-8 binary frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                result = Err(e).context("read frame");
                break;
            }
        }
    }

    // Dropping the session's sender lets the writer drain and close.
    session.disconnect();
    let _ = writer.await;
    result
}
