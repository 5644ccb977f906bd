//! Adapter registry
//!
//! Holds at most one live adapter per kind. Every mutation runs under one
//! async mutex held across stop and manage, so a racing delete and set can
//! never leave an orphaned subscription behind.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use logrelay_adapters::{Adapter, StreamHub, build};
use logrelay_bus::Bus;
use logrelay_core::adapter::probe_kind;
use logrelay_core::subject::ADAPTER_PATTERNS;
use logrelay_core::{AdapterConfig, AdapterKind, LogRecord};
use logrelay_security::Redactor;
use logrelay_storage::StateStore;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{RegistryError, Result};

pub struct Registry {
    bus: Arc<dyn Bus>,
    redactor: Redactor,
    hub: StreamHub,
    store: StateStore,
    adapters: Mutex<BTreeMap<AdapterKind, Box<dyn Adapter>>>,
}

impl Registry {
    pub fn new(bus: Arc<dyn Bus>, redactor: Redactor, hub: StreamHub, store: StateStore) -> Self {
        Self {
            bus,
            redactor,
            hub,
            store,
            adapters: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create or replace the adapter of the configured kind.
    ///
    /// The new adapter is built before anything else happens, so an invalid
    /// configuration leaves the current instance running.
    pub async fn set(&self, raw: &[u8]) -> Result<AdapterConfig> {
        let config = AdapterConfig::parse(raw)?;
        let kind = config.kind();
        let mut adapter = build(config.clone(), &self.hub).await?;

        let mut adapters = self.adapters.lock().await;
        if let Some(mut previous) = adapters.remove(&kind) {
            previous.stop().await;
        }
        adapter
            .manage(
                Arc::clone(&self.bus),
                &ADAPTER_PATTERNS,
                self.redactor.clone(),
            )
            .await?;

        let raw = String::from_utf8_lossy(raw);
        if let Err(err) = self.store.record(kind, &raw).await {
            warn!(kind = %kind, error = %err, "could not persist adapter");
        }
        adapters.insert(kind, adapter);
        info!(kind = %kind, "adapter set");
        Ok(config)
    }

    /// Stop and forget an optional adapter.
    pub async fn delete(&self, raw: &[u8]) -> Result<()> {
        let kind = probe_kind(raw)?;
        if kind.is_mandatory() {
            return Err(RegistryError::BasicNotOptional);
        }

        let mut adapters = self.adapters.lock().await;
        let mut adapter = adapters.remove(&kind).ok_or(RegistryError::InvalidType)?;
        adapter.stop().await;
        if let Err(err) = self.store.forget(kind).await {
            warn!(kind = %kind, error = %err, "could not persist adapter removal");
        }
        info!(kind = %kind, "adapter deleted");
        Ok(())
    }

    /// Configurations of the live adapters, ordered basic, logstash, rollbar, sse.
    pub async fn find(&self) -> Vec<AdapterConfig> {
        self.adapters
            .lock()
            .await
            .values()
            .map(|adapter| adapter.config())
            .collect()
    }

    pub async fn is_active(&self, kind: AdapterKind) -> bool {
        self.adapters.lock().await.contains_key(&kind)
    }

    /// Rebuild the adapters recorded before the last shutdown.
    ///
    /// Without a usable basic configuration a basic adapter is created on
    /// `default_logfile`; failing that is fatal.
    pub async fn load_persisted(&self, default_logfile: &Path) -> Result<()> {
        let state = match self.store.load().await {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "ignoring persisted adapters");
                Default::default()
            }
        };

        for (kind, raw) in state.iter() {
            if let Err(err) = self.set(raw.as_bytes()).await {
                warn!(kind = %kind, error = %err, "could not restore adapter");
            }
        }

        if !self.is_active(AdapterKind::Basic).await {
            let config = AdapterConfig::basic(default_logfile.to_string_lossy());
            let raw = serde_json::to_vec(&config)
                .map_err(|err| RegistryError::InvalidConfig(err.to_string()))?;
            self.set(&raw)
                .await
                .map_err(|err| RegistryError::NoBasicAdapter(err.to_string()))?;
        }
        Ok(())
    }

    /// Hand a pre-redacted record to every live adapter.
    ///
    /// Deliveries run after the lock is released; an adapter replaced
    /// meanwhile may still receive this record.
    pub async fn dispatch_log(&self, record: &LogRecord) {
        let sinks: Vec<_> = self
            .adapters
            .lock()
            .await
            .values()
            .filter_map(|adapter| adapter.record_sink())
            .collect();
        for sink in sinks {
            sink.log(record).await;
        }
    }

    /// Stop every adapter.
    pub async fn shutdown(&self) {
        let mut adapters = self.adapters.lock().await;
        while let Some((_, mut adapter)) = adapters.pop_first() {
            adapter.stop().await;
        }
    }
}
