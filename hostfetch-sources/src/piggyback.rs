//! Piggyback fetcher.
//!
//! Piggybacked data is written to disk by the agents of other hosts, so
//! there is nothing to fetch here. The fetcher exists so piggyback hosts
//! go through the same trigger and cache path as every other source.

use async_trait::async_trait;
use hostfetch_core::{AgentRawData, HostName, Mode};
use hostfetch_fetch::{FetchFailure, Fetcher, FetcherType};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Always succeeds with an empty payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiggybackFetcher {
    /// Host the data belongs to.
    pub hostname: HostName,
    /// Address of the host, if it has one.
    #[serde(default)]
    pub address: Option<String>,
}

impl PiggybackFetcher {
    /// Creates a fetcher for `hostname`.
    pub fn new(hostname: HostName, address: Option<String>) -> Self {
        Self { hostname, address }
    }
}

#[async_trait]
impl Fetcher for PiggybackFetcher {
    type RawData = AgentRawData;

    fn fetcher_type(&self) -> FetcherType {
        FetcherType::Piggyback
    }

    async fn open(&mut self) -> Result<(), FetchFailure> {
        Ok(())
    }

    async fn close(&mut self) {}

    async fn fetch_from_io(&mut self, _mode: Mode) -> Result<AgentRawData, FetchFailure> {
        trace!(host = %self.hostname, "Piggyback data is delivered out of band");
        Ok(AgentRawData::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostfetch_fetch::FetcherExt;

    #[tokio::test]
    async fn test_always_empty() {
        let mut fetcher = PiggybackFetcher::new(HostName::new("vm-17").unwrap(), None);
        for mode in [Mode::Checking, Mode::Discovery, Mode::None] {
            let raw = fetcher.fetch(mode).await.unwrap().unwrap();
            assert!(raw.is_empty());
        }
    }

    #[test]
    fn test_params_from_json() {
        let fetcher: PiggybackFetcher =
            serde_json::from_str(r#"{"hostname": "vm-17", "address": "10.0.0.17"}"#).unwrap();
        assert_eq!(fetcher.address.as_deref(), Some("10.0.0.17"));
        assert_eq!(fetcher.fetcher_type(), FetcherType::Piggyback);
    }
}
