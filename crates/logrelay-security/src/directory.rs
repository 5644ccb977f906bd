//! Secret directory
//!
//! Process-wide cache of credential literals known to the directory service.
//! The cache is an immutable snapshot behind an `RwLock`; refills and merges
//! build a new snapshot and swap it in, so readers never observe a partial
//! update.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use logrelay_bus::{Bus, BusError};
use logrelay_core::subject::DIRECTORY_FIND;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::envelope::CredentialHolder;
use crate::error::{DirectoryError, Result};

/// Where credential-holder records come from.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<CredentialHolder>>;
}

/// Asks the directory service over the bus.
pub struct BusSecretSource {
    bus: Arc<dyn Bus>,
    subject: String,
    timeout: Duration,
}

impl BusSecretSource {
    pub fn new(bus: Arc<dyn Bus>, subject: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bus,
            subject: subject.into(),
            timeout,
        }
    }

    /// Source on the default `datacenter.find` subject with a one second timeout.
    pub fn with_defaults(bus: Arc<dyn Bus>) -> Self {
        Self::new(bus, DIRECTORY_FIND, Duration::from_secs(1))
    }
}

#[async_trait]
impl SecretSource for BusSecretSource {
    async fn fetch(&self) -> Result<Vec<CredentialHolder>> {
        let reply = self
            .bus
            .request(&self.subject, b"{}".to_vec(), self.timeout)
            .await?;
        Ok(serde_json::from_slice(&reply.payload)?)
    }
}

/// Fixed set of records, or a source that always fails.
pub struct StaticSecretSource {
    records: Option<Vec<CredentialHolder>>,
}

impl StaticSecretSource {
    pub fn new(records: Vec<CredentialHolder>) -> Self {
        Self {
            records: Some(records),
        }
    }

    pub fn unavailable() -> Self {
        Self { records: None }
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn fetch(&self) -> Result<Vec<CredentialHolder>> {
        match &self.records {
            Some(records) => Ok(records.clone()),
            None => Err(DirectoryError::Bus(BusError::NoResponders(
                DIRECTORY_FIND.to_string(),
            ))),
        }
    }
}

pub struct SecretDirectory {
    source: Arc<dyn SecretSource>,
    snapshot: RwLock<Option<Arc<Vec<String>>>>,
    /// Literals merged before the first successful fetch
    pending: Mutex<Vec<String>>,
    refill: Mutex<()>,
}

impl SecretDirectory {
    pub fn new(source: Arc<dyn SecretSource>) -> Self {
        Self {
            source,
            snapshot: RwLock::new(None),
            pending: Mutex::new(Vec::new()),
            refill: Mutex::new(()),
        }
    }

    /// Cached literals, fetching them from the source on first use.
    ///
    /// Fetch failures are returned and not cached; the next call retries.
    pub async fn literals(&self) -> Result<Arc<Vec<String>>> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        // One fetch at a time; late arrivals reuse its result.
        let _refill = self.refill.lock().await;
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let records = self.source.fetch().await?;
        let mut literals = Vec::new();
        for record in &records {
            extend_unique(&mut literals, record.literals());
        }

        let mut slot = self.snapshot.write().await;
        let pending = std::mem::take(&mut *self.pending.lock().await);
        extend_unique(&mut literals, pending);

        info!(
            records = records.len(),
            literals = literals.len(),
            "loaded directory secrets"
        );
        let snapshot = Arc::new(literals);
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Fold a created or updated record into the cache without a round trip.
    ///
    /// Returns how many literals were not known yet.
    pub async fn merge(&self, record: &CredentialHolder) -> usize {
        let mut slot = self.snapshot.write().await;
        let added = match slot.as_ref() {
            Some(current) => {
                let mut next = current.as_ref().clone();
                let added = extend_unique(&mut next, record.literals());
                if added > 0 {
                    *slot = Some(Arc::new(next));
                }
                added
            }
            None => extend_unique(&mut *self.pending.lock().await, record.literals()),
        };
        debug!(added, "merged directory record");
        added
    }

    /// Drop the cached snapshot; the next read refetches.
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
    }

    pub async fn is_loaded(&self) -> bool {
        self.snapshot.read().await.is_some()
    }
}

fn extend_unique(target: &mut Vec<String>, literals: Vec<String>) -> usize {
    let mut added = 0;
    for literal in literals {
        if !literal.is_empty() && !target.contains(&literal) {
            target.push(literal);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use logrelay_bus::{MemoryBus, respond};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        records: Vec<CredentialHolder>,
    }

    #[async_trait]
    impl SecretSource for CountingSource {
        async fn fetch(&self) -> Result<Vec<CredentialHolder>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.clone())
        }
    }

    fn holder(password: &str, key: &str) -> CredentialHolder {
        CredentialHolder {
            password: Some(password.to_string()),
            aws_access_key_id: Some(key.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetches_once_and_caches() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            records: vec![holder("pw", "key"), holder("pw", "")],
        });
        let directory = SecretDirectory::new(source.clone());

        let first = directory.literals().await.unwrap();
        let second = directory.literals().await.unwrap();

        assert_eq!(first.as_slice(), ["pw".to_string(), "key".to_string()]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_directory_is_cached() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            records: Vec::new(),
        });
        let directory = SecretDirectory::new(source.clone());

        assert!(directory.literals().await.unwrap().is_empty());
        assert!(directory.literals().await.unwrap().is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_merge_swaps_snapshot_without_refetch() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            records: vec![holder("pw", "key")],
        });
        let directory = SecretDirectory::new(source.clone());
        let before = directory.literals().await.unwrap();

        let added = directory.merge(&holder("new-pw", "key")).await;
        let after = directory.literals().await.unwrap();

        assert_eq!(added, 1);
        assert_eq!(before.len(), 2);
        assert!(after.contains(&"new-pw".to_string()));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_merge_before_first_fetch_is_kept() {
        let directory = SecretDirectory::new(Arc::new(StaticSecretSource::new(vec![])));
        directory.merge(&holder("early", "")).await;
        assert!(!directory.is_loaded().await);

        let literals = directory.literals().await.unwrap();
        assert_eq!(literals.as_slice(), ["early".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let directory = SecretDirectory::new(Arc::new(StaticSecretSource::unavailable()));
        assert!(directory.literals().await.is_err());
        assert!(!directory.is_loaded().await);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            records: vec![holder("pw", "key")],
        });
        let directory = SecretDirectory::new(source.clone());
        directory.literals().await.unwrap();
        directory.invalidate().await;
        directory.literals().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bus_source() {
        let bus = MemoryBus::new();
        let mut requests = bus.subscribe(DIRECTORY_FIND).await.unwrap();
        let responder = {
            let bus = bus.clone();
            tokio::spawn(async move {
                let request = requests.next().await.unwrap();
                let body = br#"[{"name":"dc","password":"from-bus","azure_tenant_id":"t-1"}]"#;
                respond(&bus, &request, body.to_vec()).await.unwrap();
            })
        };

        let source = BusSecretSource::with_defaults(Arc::new(bus.clone()));
        let records = source.fetch().await.unwrap();
        responder.await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].literals(), vec!["from-bus".to_string(), "t-1".to_string()]);
    }

    #[tokio::test]
    async fn test_bus_source_malformed_reply() {
        let bus = MemoryBus::new();
        let mut requests = bus.subscribe(DIRECTORY_FIND).await.unwrap();
        let responder = {
            let bus = bus.clone();
            tokio::spawn(async move {
                let request = requests.next().await.unwrap();
                respond(&bus, &request, b"not json".to_vec()).await.unwrap();
            })
        };

        let source = BusSecretSource::with_defaults(Arc::new(bus.clone()));
        let err = source.fetch().await.unwrap_err();
        responder.await.unwrap();
        assert!(matches!(err, DirectoryError::Malformed(_)));
    }
}
