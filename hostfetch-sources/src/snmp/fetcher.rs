//! The SNMP fetcher.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hostfetch_core::{
    HostName, Mode, SectionName, SnmpDetectSpec, SnmpPluginStore, SnmpRawData, SnmpRawSection,
};
use hostfetch_fetch::{FetchFailure, Fetcher, FetcherError, FetcherType};
use hostfetch_store::{ConfiguredFetchIntervallCache, WalkCache};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::backend::{BackendFactory, SnmpBackend, StoredWalkBackend};
use super::config::{SnmpBackendKind, SnmpFetcherConfig, SnmpHostConfig};
use super::detect::gather_available_raw_section_names;
use super::selection::{SectionMetas, detection_candidates, sort_sections, static_selection};
use super::table::get_snmp_table;

/// Fetches the SNMP sections of one device.
///
/// The backend slot is empty before [`Fetcher::open`] and after
/// [`Fetcher::close`]; fetching without a backend is
/// [`FetcherError::MissingBackend`].
///
/// Only construction parameters are serialized. The plugin store and
/// backend factory must be attached again after deserializing.
#[derive(Serialize, Deserialize)]
pub struct SnmpFetcher {
    /// Selection flags per section.
    pub sections: SectionMetas,
    /// The device.
    pub host_config: SnmpHostConfig,
    /// Paths, intervals and detection settings.
    pub config: SnmpFetcherConfig,
    #[serde(skip)]
    plugin_store: Arc<SnmpPluginStore>,
    #[serde(skip)]
    backend_factory: Option<Arc<dyn BackendFactory>>,
    #[serde(skip)]
    backend: Option<Box<dyn SnmpBackend>>,
    #[serde(skip)]
    fixed_time: Option<i64>,
}

impl fmt::Debug for SnmpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnmpFetcher")
            .field("host", &self.host_config.hostname)
            .field("sections", &self.sections.len())
            .field("known_sections", &self.plugin_store.0.len())
            .field("has_factory", &self.backend_factory.is_some())
            .field("open", &self.backend.is_some())
            .finish_non_exhaustive()
    }
}

impl SnmpFetcher {
    /// Creates a closed fetcher.
    pub fn new(
        host_config: SnmpHostConfig,
        sections: SectionMetas,
        config: SnmpFetcherConfig,
        plugin_store: Arc<SnmpPluginStore>,
    ) -> Self {
        Self {
            sections,
            host_config,
            config,
            plugin_store,
            backend_factory: None,
            backend: None,
            fixed_time: None,
        }
    }

    /// Attaches the section descriptions.
    #[must_use]
    pub fn with_plugin_store(mut self, plugin_store: Arc<SnmpPluginStore>) -> Self {
        self.plugin_store = plugin_store;
        self
    }

    /// Attaches the factory for protocol backends.
    #[must_use]
    pub fn with_backend_factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.backend_factory = Some(factory);
        self
    }

    /// Uses a fixed epoch second instead of the system clock.
    #[must_use]
    pub fn with_fixed_time(mut self, now: i64) -> Self {
        self.fixed_time = Some(now);
        self
    }

    /// The device's host name.
    pub fn hostname(&self) -> &HostName {
        &self.host_config.hostname
    }

    /// Whether a backend is open.
    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// The backend that `open` will create.
    pub fn backend_kind(&self) -> SnmpBackendKind {
        self.config
            .backend_override
            .unwrap_or(self.host_config.backend)
    }

    fn now(&self) -> i64 {
        self.fixed_time.unwrap_or_else(|| Utc::now().timestamp())
    }

    /// Statically selected sections and the detection specs of the
    /// sections that have to be probed.
    fn selection_plan(
        &self,
        mode: Mode,
    ) -> (BTreeSet<SectionName>, Vec<(SectionName, SnmpDetectSpec)>) {
        let selected = static_selection(&self.sections, mode);
        let probes = detection_candidates(
            &self.sections,
            &self.plugin_store,
            mode,
            self.config.do_status_data_inventory,
        )
        .into_iter()
        .filter_map(|name| {
            let spec = self.plugin_store.get(&name)?.detect_spec.clone();
            Some((name, spec))
        })
        .collect();
        (selected, probes)
    }

    /// Applies the caller's restriction and the discovery rule.
    fn final_selection(
        &self,
        mode: Mode,
        selected: BTreeSet<SectionName>,
        detected: BTreeSet<SectionName>,
    ) -> Result<BTreeSet<SectionName>, FetcherError> {
        let selection: BTreeSet<SectionName> = selected
            .into_iter()
            .chain(detected)
            .filter(|name| self.config.selected_sections.includes(name))
            .collect();

        if mode == Mode::Discovery && selection.is_empty() {
            return Err(FetcherError::Snmp("no applicable sections found".to_string()));
        }
        Ok(selection)
    }

    #[instrument(skip_all, fields(host = %self.host_config.hostname, mode = %mode))]
    async fn fetch_with(
        &mut self,
        backend: &mut dyn SnmpBackend,
        mode: Mode,
    ) -> Result<SnmpRawData, FetchFailure> {
        let host = self.host_config.hostname.clone();

        let mut section_cache = ConfiguredFetchIntervallCache::new(
            self.config.section_cache_path(&host),
            self.config.intervals_for(&host),
            self.now(),
        );
        if mode == Mode::Checking {
            section_cache.load().await;
        }

        let (selected, probes) = self.selection_plan(mode);
        let scan_config = self.config.scan_config();
        let detected = gather_available_raw_section_names(&probes, &scan_config, backend).await?;
        let selection = self.final_selection(mode, selected, detected)?;
        debug!(sections = selection.len(), "Sections selected");

        let mut walk_cache = WalkCache::new(self.config.walk_cache_path(&host));
        if mode == Mode::Checking {
            walk_cache.load().await;
        } else {
            walk_cache.clear().await;
        }

        let mut raw = SnmpRawData::new();
        for section in sort_sections(&selection) {
            if section_cache.contains(&section) {
                debug!(section = %section, "Section still valid in cache");
                continue;
            }
            let Some(item) = self.plugin_store.get(&section) else {
                warn!(section = %section, "Selected section has no description, skipping");
                continue;
            };

            let mut tables = SnmpRawSection::with_capacity(item.trees.len());
            for tree in &item.trees {
                let table =
                    get_snmp_table(tree, &self.host_config.contexts, &mut walk_cache, backend)
                        .await?;
                tables.push(table);
            }
            section_cache.insert(section.clone(), tables.clone());
            raw.insert(section_cache.fresh_marker(&section), tables);
        }

        walk_cache.save().await;
        section_cache.save().await;

        for (section, (captured_at, payload)) in section_cache.cached_entries() {
            if selection.contains(section) {
                raw.insert(section_cache.marker(section, *captured_at), payload.clone());
            }
        }

        info!(sections = raw.len(), "SNMP fetch complete");
        Ok(raw)
    }
}

#[async_trait]
impl Fetcher for SnmpFetcher {
    type RawData = SnmpRawData;

    fn fetcher_type(&self) -> FetcherType {
        FetcherType::Snmp
    }

    async fn open(&mut self) -> Result<(), FetchFailure> {
        let kind = self.backend_kind();
        let backend: Box<dyn SnmpBackend> = match kind {
            SnmpBackendKind::StoredWalk => {
                let path = self.config.stored_walk_path(&self.host_config.hostname);
                Box::new(StoredWalkBackend::open(self.host_config.hostname.clone(), &path).await?)
            }
            other => {
                let Some(factory) = self.backend_factory.clone() else {
                    return Err(FetcherError::Snmp(format!(
                        "No {other} SNMP backend available"
                    ))
                    .into());
                };
                factory.create(other, &self.host_config).await?
            }
        };
        debug!(host = %self.host_config.hostname, backend = %kind, "SNMP backend opened");
        self.backend = Some(backend);
        Ok(())
    }

    async fn close(&mut self) {
        if self.backend.take().is_some() {
            debug!(host = %self.host_config.hostname, "SNMP backend closed");
        }
    }

    async fn fetch_from_io(&mut self, mode: Mode) -> Result<SnmpRawData, FetchFailure> {
        let mut backend = self.backend.take().ok_or(FetcherError::MissingBackend)?;
        let result = self.fetch_with(backend.as_mut(), mode).await;
        self.backend = Some(backend);
        result
    }
}
