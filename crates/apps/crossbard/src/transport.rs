//! Frame-oriented TCP transport behind the core's `ServerTransport` boundary.
//!
//! One reader task per connection decodes frames into a shared bounded
//! inbound queue; one writer task per connection drains an outbound queue.
//! Peer ids are assigned on accept and die with the connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use crossbar_api::{Message, ServerTransport, TransportError};
use rmpv::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::codec;

const INBOUND_QUEUE_DEPTH: usize = 64;

pub struct TcpTransport {
    local_addr: SocketAddr,
    inbound: tokio::sync::Mutex<mpsc::Receiver<Message>>,
    peers: Mutex<HashMap<u32, mpsc::UnboundedSender<Value>>>,
    cancel: CancellationToken,
}

impl TcpTransport {
    /// Binds `addr` and starts accepting connections.
    pub async fn bind(addr: SocketAddr) -> std::io::Result<Arc<Self>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        let transport = Arc::new(Self {
            local_addr,
            inbound: tokio::sync::Mutex::new(inbound_rx),
            peers: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        });
        let accept = transport.clone();
        tokio::spawn(async move { accept.accept_loop(listener, inbound_tx).await });
        Ok(transport)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting and unwinds every per-connection task.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener, inbound_tx: mpsc::Sender<Message>) {
        let mut next_peer: u32 = 1;
        loop {
            let stream = tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        log::debug!("transport: peer {next_peer:08x} connected from {remote}");
                        stream
                    }
                    Err(err) => {
                        log::warn!("transport: accept failed: {err}");
                        continue;
                    }
                },
            };
            let peer = next_peer;
            next_peer = next_peer.wrapping_add(1);
            self.spawn_connection(peer, stream, inbound_tx.clone());
        }
        log::debug!("transport: accept loop exiting");
    }

    fn spawn_connection(
        self: &Arc<Self>,
        peer: u32,
        stream: TcpStream,
        inbound_tx: mpsc::Sender<Message>,
    ) {
        let (mut read_half, mut write_half) = stream.into_split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        self.peers
            .lock()
            .expect("peer table mutex poisoned")
            .insert(peer, outbound_tx);

        let reader = self.clone();
        let reader_cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    frame = codec::read_frame(&mut read_half) => frame,
                };
                match frame {
                    Ok(body) => {
                        if inbound_tx.send(Message::with_body(peer, body)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        if err.kind() != std::io::ErrorKind::UnexpectedEof {
                            log::debug!("transport: peer {peer:08x} read failed: {err}");
                        }
                        break;
                    }
                }
            }
            reader
                .peers
                .lock()
                .expect("peer table mutex poisoned")
                .remove(&peer);
            log::debug!("transport: peer {peer:08x} disconnected");
        });

        let writer_cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let value = tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    value = outbound_rx.recv() => match value {
                        Some(value) => value,
                        None => break,
                    },
                };
                if let Err(err) = codec::write_frame(&mut write_half, &value).await {
                    log::debug!("transport: peer {peer:08x} write failed: {err}");
                    break;
                }
            }
        });
    }
}

#[async_trait]
impl ServerTransport for TcpTransport {
    async fn recv(&self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        // The queue lock is taken inside the timeout so the whole wait stays
        // bounded even when several workers contend for it.
        let waited = tokio::time::timeout(timeout, async {
            let mut inbound = self.inbound.lock().await;
            inbound.recv().await
        })
        .await;
        match waited {
            Err(_) => Ok(None),
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(TransportError::Closed),
        }
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        let sender = self
            .peers
            .lock()
            .expect("peer table mutex poisoned")
            .get(&message.peer)
            .cloned();
        match sender {
            Some(sender) => {
                // The connection may die between lookup and push; either way
                // the response is simply gone with its peer.
                let _ = sender.send(message.body);
            }
            None => {
                log::debug!(
                    "transport: dropping response for vanished peer {:08x}",
                    message.peer
                );
            }
        }
        Ok(())
    }
}
