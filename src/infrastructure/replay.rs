//! Transport that plays decoded events back from a JSON-lines file.
//!
//! Each non-blank line holds one event in wire shape, e.g.
//! `{"t":"MESSAGE_CREATE","d":{...}}`. Lines starting with `#` are comments.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::events::GatewayEvent;
use crate::domain::ports::{GatewayCommand, GatewayPort};

/// Failure to read a replay file.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes every event in `text`, reporting the first bad line.
///
/// # Errors
///
/// Returns `ReplayError::Decode` with the 1-based line number.
pub fn parse_events(text: &str) -> Result<Vec<GatewayEvent>, ReplayError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| ReplayError::Decode {
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Reads and decodes a replay file.
///
/// # Errors
///
/// Returns `ReplayError` if the file cannot be read or a line fails to decode.
pub async fn load_events(path: &Path) -> Result<Vec<GatewayEvent>, ReplayError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_events(&text)
}

/// [`GatewayPort`] that feeds a fixed list of events with optional pacing.
pub struct ReplayGateway {
    source: PathBuf,
    pace: Duration,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    sent: Vec<GatewayCommand>,
}

impl ReplayGateway {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, pace: Duration) -> Self {
        Self {
            source: source.into(),
            pace,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
            sent: Vec::new(),
        }
    }

    /// Commands the session sent so far.
    #[must_use]
    pub fn sent(&self) -> &[GatewayCommand] {
        &self.sent
    }
}

impl std::fmt::Debug for ReplayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGateway")
            .field("source", &self.source)
            .field("pace", &self.pace)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GatewayPort for ReplayGateway {
    async fn connect(
        &mut self,
        token: &AuthToken,
    ) -> Result<mpsc::UnboundedReceiver<GatewayEvent>, AuthError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(AuthError::network("replay already running"));
        }

        let events = load_events(&self.source)
            .await
            .map_err(|e| AuthError::network(e.to_string()))?;
        info!(
            source = %self.source.display(),
            events = events.len(),
            token = %token.masked(),
            "starting replay"
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let running = Arc::clone(&self.running);
        let pace = self.pace;
        running.store(true, Ordering::SeqCst);

        self.task = Some(tokio::spawn(async move {
            for event in events {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                debug!(event = event.name(), "replaying");
                if event_tx.send(event).is_err() {
                    break;
                }
                if !pace.is_zero() {
                    tokio::time::sleep(pace).await;
                }
            }
            running.store(false, Ordering::SeqCst);
        }));

        Ok(event_rx)
    }

    async fn send(&mut self, command: GatewayCommand) {
        info!(?command, "replay transport received command");
        self.sent.push(command);
    }

    fn disconnect(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_connected(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for ReplayGateway {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Token used when replaying without an account.
#[must_use]
pub fn replay_token() -> AuthToken {
    AuthToken::new_unchecked("replay")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Status;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LOG: &str = r##"
# fresh session
{"t":"READY","d":{"user":{"id":"1","username":"me"},"status":"online"}}
{"t":"RESUMED"}
{"t":"TRANSPORT_CLOSED","d":{"code":4004}}
"##;

    fn log_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_skips_blanks_and_comments() {
        let events = parse_events(LOG).unwrap();

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], GatewayEvent::Ready(r) if r.status == Status::Online));
        assert_eq!(events[1], GatewayEvent::Resumed);
        assert_eq!(events[2], GatewayEvent::TransportClosed { code: Some(4004) });
    }

    #[test]
    fn test_parse_reports_line() {
        let err = parse_events("{\"t\":\"RESUMED\"}\n\nnot json\n").unwrap_err();
        assert!(matches!(err, ReplayError::Decode { line: 3, .. }));
    }

    #[tokio::test]
    async fn test_connect_streams_file() {
        let file = log_file(LOG);
        let mut gateway = ReplayGateway::new(file.path(), Duration::ZERO);

        let mut rx = gateway.connect(&replay_token()).await.unwrap();
        let mut names = Vec::new();
        while let Some(event) = rx.recv().await {
            names.push(event.name());
        }

        assert_eq!(names, ["READY", "RESUMED", "TRANSPORT_CLOSED"]);
        assert!(!gateway.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_and_disconnect() {
        let file = log_file(LOG);
        let mut gateway = ReplayGateway::new(file.path(), Duration::from_secs(1));

        let mut rx = gateway.connect(&replay_token()).await.unwrap();
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("READY"));
        assert!(gateway.is_connected());

        gateway.disconnect();
        assert!(!gateway.is_connected());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_fails_connect() {
        let mut gateway = ReplayGateway::new("/nonexistent/cordsync.jsonl", Duration::ZERO);
        let err = gateway.connect(&replay_token()).await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_commands_are_recorded() {
        let mut gateway = ReplayGateway::new("unused", Duration::ZERO);
        gateway.send(GatewayCommand::UpdateStatus(Status::Idle)).await;
        gateway.send(GatewayCommand::Logout).await;

        assert_eq!(
            gateway.sent(),
            [GatewayCommand::UpdateStatus(Status::Idle), GatewayCommand::Logout]
        );
    }
}
