//! TCP agent fetcher.
//!
//! The agent writes its full output on connect and closes the connection,
//! so a fetch is connect, read to EOF, close.

use std::time::Duration;

use async_trait::async_trait;
use hostfetch_core::{AgentRawData, Mode};
use hostfetch_fetch::{FetchFailure, Fetcher, FetcherError, FetcherType};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, instrument, warn};

/// Default agent port.
pub const DEFAULT_AGENT_PORT: u16 = 6556;

fn default_port() -> u16 {
    DEFAULT_AGENT_PORT
}

fn default_timeout() -> f64 {
    5.0
}

/// Reads the output of an agent listening on TCP.
#[derive(Debug, Serialize, Deserialize)]
pub struct TcpFetcher {
    /// Host name or IP address of the agent.
    pub address: String,
    /// Agent port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect and read timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(skip)]
    stream: Option<TcpStream>,
}

impl TcpFetcher {
    /// Creates a closed fetcher with the default timeout.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            timeout: default_timeout(),
            stream: None,
        }
    }

    /// Sets the connect and read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.as_secs_f64();
        self
    }

    fn deadline(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout).unwrap_or(Duration::from_secs(5))
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[async_trait]
impl Fetcher for TcpFetcher {
    type RawData = AgentRawData;

    fn fetcher_type(&self) -> FetcherType {
        FetcherType::Tcp
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint()))]
    async fn open(&mut self) -> Result<(), FetchFailure> {
        let connect = TcpStream::connect((self.address.as_str(), self.port));
        let stream = match tokio::time::timeout(self.deadline(), connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(FetcherError::Connection(format!(
                    "Could not connect to {}: {e}",
                    self.endpoint()
                ))
                .into());
            }
            Err(_) => {
                return Err(FetcherError::Timeout(format!(
                    "Connection to {} timed out after {}s",
                    self.endpoint(),
                    self.timeout
                ))
                .into());
            }
        };
        debug!("Connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) {
        self.stream = None;
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint()))]
    async fn fetch_from_io(&mut self, _mode: Mode) -> Result<AgentRawData, FetchFailure> {
        let deadline = self.deadline();
        let stream = self.stream.as_mut().ok_or(FetcherError::MissingBackend)?;

        let mut payload = Vec::new();
        let read = tokio::time::timeout(deadline, stream.read_to_end(&mut payload)).await;
        match read {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(FetcherError::Io(e).into()),
            Err(_) => {
                warn!(bytes = payload.len(), "Agent did not finish in time");
                return Err(FetcherError::Timeout(format!(
                    "Reading from {} timed out after {}s",
                    self.endpoint(),
                    self.timeout
                ))
                .into());
            }
        }

        if payload.is_empty() {
            return Err(FetcherError::NoData("Got no data".to_string()).into());
        }
        debug!(bytes = payload.len(), "Agent output read");
        Ok(AgentRawData(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostfetch_fetch::FetcherExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    /// Serves `payload` once, holding the connection for `hold` first.
    async fn agent(payload: &'static [u8], hold: Duration) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(hold).await;
            let _ = socket.write_all(payload).await;
        });
        port
    }

    #[tokio::test]
    async fn test_reads_until_eof() {
        let port = agent(b"<<<check_mk>>>\nVersion: 2.3.0\n", Duration::ZERO).await;
        let mut fetcher = TcpFetcher::new("127.0.0.1", port);

        let raw = fetcher.fetch(Mode::Checking).await.unwrap().unwrap();
        assert_eq!(raw.as_bytes(), b"<<<check_mk>>>\nVersion: 2.3.0\n");
    }

    #[tokio::test]
    async fn test_empty_payload_is_fault() {
        let port = agent(b"", Duration::ZERO).await;
        let mut fetcher = TcpFetcher::new("127.0.0.1", port);

        let err = fetcher.fetch(Mode::Checking).await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Got no data");
    }

    #[tokio::test]
    async fn test_refused_connection_is_fault() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut fetcher = TcpFetcher::new("127.0.0.1", port);
        let err = fetcher.fetch(Mode::Checking).await.unwrap().unwrap_err();
        assert!(matches!(err, FetcherError::Connection(_)));
    }

    #[tokio::test]
    async fn test_slow_agent_times_out() {
        let port = agent(b"late", Duration::from_secs(2)).await;
        let mut fetcher =
            TcpFetcher::new("127.0.0.1", port).with_timeout(Duration::from_millis(100));

        let err = fetcher.fetch(Mode::Checking).await.unwrap().unwrap_err();
        assert!(matches!(err, FetcherError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fetch_without_open_is_missing_backend() {
        let mut fetcher = TcpFetcher::new("127.0.0.1", DEFAULT_AGENT_PORT);
        let result = fetcher.fetch_from_io(Mode::Checking).await;
        assert!(matches!(
            result,
            Err(FetchFailure::Error(FetcherError::MissingBackend))
        ));
    }

    #[test]
    fn test_params_defaults() {
        let fetcher: TcpFetcher = serde_json::from_str(r#"{"address": "10.1.1.5"}"#).unwrap();
        assert_eq!(fetcher.port, DEFAULT_AGENT_PORT);
        assert!((fetcher.timeout - 5.0).abs() < f64::EPSILON);
    }
}
