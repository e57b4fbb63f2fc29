//! WebSocket transport: one text frame per JSON envelope.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::{Link, Transport, LINK_CAPACITY};
use crate::error::CollabError;
use crate::protocol::Envelope;

pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    /// `token`, when present, is passed as the percent-encoded `token`
    /// query parameter.
    pub fn new(server_url: &str, token: Option<&str>) -> Result<Self, CollabError> {
        let url = match token {
            Some(token) if !token.is_empty() => {
                let mut url = reqwest::Url::parse(server_url)
                    .map_err(|e| CollabError::Transport(format!("invalid server url '{server_url}': {e}")))?;
                url.query_pairs_mut().append_pair("token", token);
                url.to_string()
            }
            _ => server_url.to_string(),
        };
        Ok(Self { url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self) -> Result<Link, CollabError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| CollabError::Transport(e.to_string()))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<Envelope>(LINK_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<Envelope>(LINK_CAPACITY);

        // Writer task: forward outgoing envelopes to the socket
        tokio::spawn(async move {
            while let Some(envelope) = out_rx.recv().await {
                let text = match envelope.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("Dropping unencodable '{}': {e}", envelope.event);
                        continue;
                    }
                };
                if ws_writer.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_writer.close().await;
        });

        // Reader task: decode incoming frames until close or error
        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match Envelope::decode(text.as_str()) {
                        Ok(envelope) => {
                            if in_tx.send(envelope).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("Skipping malformed frame: {e}"),
                    },
                    Ok(Message::Close(_)) => break,
                    Err(e) => {
                        log::warn!("WebSocket read failed: {e}");
                        break;
                    }
                    _ => {}
                }
            }
            log::info!("WebSocket reader finished");
        });

        Ok(Link {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_query_parameter() {
        let t = WebSocketTransport::new("ws://localhost:5000/ws", Some("abc")).unwrap();
        assert_eq!(t.url(), "ws://localhost:5000/ws?token=abc");

        let t = WebSocketTransport::new("ws://h/ws?v=1", Some("abc")).unwrap();
        assert_eq!(t.url(), "ws://h/ws?v=1&token=abc");

        let t = WebSocketTransport::new("ws://h/ws", None).unwrap();
        assert_eq!(t.url(), "ws://h/ws");
    }

    #[test]
    fn test_token_is_percent_encoded() {
        let t = WebSocketTransport::new("ws://h/ws", Some("a&b+c#d=e")).unwrap();
        assert_eq!(t.url(), "ws://h/ws?token=a%26b%2Bc%23d%3De");
    }

    #[test]
    fn test_unparseable_url_with_token() {
        let res = WebSocketTransport::new("not a url", Some("abc"));
        assert!(matches!(res, Err(CollabError::Transport(_))));
    }

    #[tokio::test]
    async fn test_open_unreachable_fails() {
        let t = WebSocketTransport::new("ws://127.0.0.1:1/ws", None).unwrap();
        assert!(matches!(t.open().await, Err(CollabError::Transport(_))));
    }
}
