//! Duplex text channel to the lift-call gateway.
//!
//! [`Transport`] is the seam the dispatcher and the correlator write through.
//! [`WsTransport`] is the WebSocket implementation; an in-memory pair is
//! available to tests behind the `test-utils` feature.

use crate::error::TransportError;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// WebSocket subprotocol the gateway speaks.
pub const SUBPROTOCOL: &str = "koneapi";

/// Ordered text channel
pub trait Transport: Send {
    /// Write one text frame. No acknowledgement is awaited.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next inbound text frame; `None` once the channel is closed.
    fn next_text(&mut self) -> impl Future<Output = Option<Result<String, TransportError>>> + Send;

    /// Close the channel.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// WebSocket connection to the gateway
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Stream endpoint for a host and bearer token.
    pub fn stream_url(api_host: &str, access_token: &str) -> String {
        format!("wss://{api_host}/stream-v2?accessToken={access_token}")
    }

    /// Open the gateway stream for `api_host`.
    pub async fn open(api_host: &str, access_token: &str) -> Result<Self, TransportError> {
        Self::connect(&Self::stream_url(api_host, access_token)).await
    }

    /// Connect to an explicit `ws://` or `wss://` URL, requesting [`SUBPROTOCOL`].
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));

        let (stream, response) = connect_async(request).await?;
        info!(status = %response.status(), "WebSocket open");
        Ok(Self { stream })
    }
}

impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "gateway closed the stream");
                    return None;
                }
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return None
                }
                Err(e) => {
                    warn!("Error receiving from gateway: {}", e);
                    return Some(Err(e.into()));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{memory_pair, MemoryPeer, MemoryTransport};

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::Transport;
    use crate::error::TransportError;
    use tokio::sync::mpsc;

    /// In-process transport; the other end is a [`MemoryPeer`].
    pub struct MemoryTransport {
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<String>,
    }

    /// Test side of a [`MemoryTransport`]
    pub struct MemoryPeer {
        /// Frames written by the client
        pub sent: mpsc::UnboundedReceiver<String>,
        /// Push frames to the client; drop to close the stream
        pub inbound: mpsc::UnboundedSender<String>,
    }

    impl MemoryPeer {
        /// Queue an inbound frame
        pub fn push(&self, frame: impl Into<String>) {
            let _ = self.inbound.send(frame.into());
        }

        /// Frames written so far, without waiting
        pub fn drain_sent(&mut self) -> Vec<String> {
            let mut frames = Vec::new();
            while let Ok(frame) = self.sent.try_recv() {
                frames.push(frame);
            }
            frames
        }
    }

    /// Connected client/peer pair
    pub fn memory_pair() -> (MemoryTransport, MemoryPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            MemoryTransport {
                outbound: out_tx,
                inbound: in_rx,
            },
            MemoryPeer {
                sent: out_rx,
                inbound: in_tx,
            },
        )
    }

    impl Transport for MemoryTransport {
        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            self.outbound.send(text).map_err(|_| TransportError::Closed)
        }

        async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
            self.inbound.recv().await.map(Ok)
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.inbound.close();
            Ok(())
        }
    }
}
