use futures_util::StreamExt;
use log::warn;
use parking_lot::Mutex;
use reqwest::Client;

use crate::{CancelToken, ClientError, ClientEvent, ClientState};

/// Maintains the subscription to the server's event channel and applies
/// every decoded event to the shared [ClientState].
pub struct LiveFeed {
    base: String,
    http: Client,
}

impl LiveFeed {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            http: Client::new(),
        }
    }

    /// Runs until cancelled or until the server closes the stream. There is
    /// no automatic reconnect, the caller decides whether to come back.
    pub async fn run(
        &self,
        state: &Mutex<ClientState>,
        cancel: &CancelToken,
    ) -> Result<(), ClientError> {
        let url = format!("{}/events", self.base);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            response = self.http.get(url).send() => response?,
        };

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = stream.next() => match chunk {
                    Some(chunk) => chunk?,
                    None => return Ok(()),
                },
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);

                if let Some(event) = parse_frame(&line) {
                    state.lock().apply(&event);
                }
            }
        }
    }
}

/// Decodes one `data:` line of the event stream. Comments, keep-alives, and
/// blank separator lines fall through.
pub fn parse_frame(line: &str) -> Option<ClientEvent> {
    let data = line.strip_prefix("data:")?.trim_start();

    match serde_json::from_str(data) {
        Ok(event) => Some(event),
        Err(error) => {
            warn!("Dropping undecodable event: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderStatus;

    #[test]
    fn data_frames_decode_into_events() {
        let line = r#"data: {"type":"newOrder","order":{"id":1,"studentName":"홍길동","userJob":"게임개발","menu":"콜라","quantity":2,"image":"","status":"pending","createdAt":"2025-06-02T03:04:05Z"}}"#;

        let event = parse_frame(line).expect("frame decodes");
        match event {
            ClientEvent::NewOrder { order } => {
                assert_eq!(order.student_name, "홍길동");
                assert_eq!(order.status, OrderStatus::Pending);
            }
            other => panic!("expected NewOrder, got {other:?}"),
        }
    }

    #[test]
    fn non_data_lines_fall_through() {
        assert!(parse_frame(": keep-alive").is_none());
        assert!(parse_frame("").is_none());
        assert!(parse_frame("event: message").is_none());
    }

    #[test]
    fn undecodable_data_is_dropped() {
        assert!(parse_frame("data: {\"type\":\"unknown\"}").is_none());
        assert!(parse_frame("data: not json").is_none());
    }
}
