//! Plain file sink

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use logrelay_bus::Bus;
use logrelay_core::record::{LEVEL_DEBUG, SYSTEM_USER};
use logrelay_core::{AdapterConfig, AdapterKind, BasicConfig, LogRecord};
use logrelay_security::Redactor;
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::adapter::Adapter;
use crate::error::{AdapterError, Result};
use crate::subscription::{RecordSink, Sink, Subscriptions};

/// Appends one line per message to an existing file.
pub struct BasicAdapter {
    config: BasicConfig,
    writer: Arc<LineWriter>,
    subscriptions: Option<Subscriptions>,
}

impl BasicAdapter {
    /// Open the configured file for appending. The file must already exist.
    pub async fn open(config: BasicConfig) -> Result<Self> {
        if !Path::new(&config.logfile).exists() {
            return Err(AdapterError::MissingLogFile(config.logfile));
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&config.logfile)
            .await
            .map_err(|source| AdapterError::LogFileAccess {
                path: config.logfile.clone(),
                source,
            })?;

        info!(logfile = %config.logfile, "basic logger set up");
        Ok(Self {
            config,
            writer: Arc::new(LineWriter {
                file: Mutex::new(Some(file)),
            }),
            subscriptions: None,
        })
    }
}

#[async_trait]
impl Adapter for BasicAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Basic
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig::Basic(self.config.clone())
    }

    async fn manage(
        &mut self,
        bus: Arc<dyn Bus>,
        patterns: &[&str],
        redactor: Redactor,
    ) -> Result<()> {
        if let Some(mut previous) = self.subscriptions.take() {
            previous.stop().await;
        }
        let sink: Arc<dyn Sink> = self.writer.clone();
        self.subscriptions =
            Some(Subscriptions::start(self.name(), bus, patterns, redactor, sink).await?);
        Ok(())
    }

    async fn stop(&mut self) {
        info!("stopping basic logger");
        if let Some(mut subscriptions) = self.subscriptions.take() {
            subscriptions.stop().await;
        }
        self.writer.close().await;
    }

    fn record_sink(&self) -> Option<Arc<dyn RecordSink>> {
        Some(self.writer.clone())
    }
}

struct LineWriter {
    file: Mutex<Option<File>>,
}

impl LineWriter {
    async fn write(&self, subject: &str, body: &str, level: &str, user: &str) {
        let line = format_line(OffsetDateTime::now_utc(), subject, body, level, user);
        let mut guard = self.file.lock().await;
        let Some(file) = guard.as_mut() else {
            return;
        };
        if let Err(err) = file.write_all(line.as_bytes()).await {
            warn!(error = %err, "could not write log line");
            return;
        }
        if let Err(err) = file.flush().await {
            warn!(error = %err, "could not flush log file");
        }
    }

    async fn close(&self) {
        let Some(mut file) = self.file.lock().await.take() else {
            return;
        };
        if let Err(err) = file.flush().await {
            warn!(error = %err, "an error occurred trying to close the log file");
        }
    }
}

#[async_trait]
impl Sink for LineWriter {
    async fn deliver(&self, subject: &str, body: String) {
        self.write(subject, &body, LEVEL_DEBUG, SYSTEM_USER).await;
    }
}

#[async_trait]
impl RecordSink for LineWriter {
    async fn log(&self, record: &LogRecord) {
        self.write(&record.subject, &record.message, &record.level, &record.user)
            .await;
    }
}

fn format_line(at: OffsetDateTime, subject: &str, body: &str, level: &str, user: &str) -> String {
    let stamp = at
        .format(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_default();
    format!("{stamp} level={level} user={user} : {subject}  '{body}'\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use logrelay_bus::MemoryBus;
    use logrelay_core::subject::ADAPTER_PATTERNS;
    use logrelay_security::{SecretDirectory, StaticSecretSource};
    use std::time::Duration;
    use time::macros::datetime;

    fn redactor() -> Redactor {
        let source = Arc::new(StaticSecretSource::new(vec![]));
        Redactor::new(Arc::new(SecretDirectory::new(source)))
    }

    async fn wait_for_line(path: &Path, needle: &str) -> String {
        for _ in 0..100 {
            let contents = tokio::fs::read_to_string(path).await.unwrap();
            if contents.contains(needle) {
                return contents;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("line containing {needle:?} never written");
    }

    #[test]
    fn test_line_format() {
        let line = format_line(
            datetime!(2024-03-05 07:08:09 UTC),
            "service.create",
            "{}",
            "debug",
            "system",
        );
        assert_eq!(
            line,
            "2024/03/05 07:08:09 level=debug user=system : service.create  '{}'\n"
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.log");
        let err = BasicAdapter::open(BasicConfig {
            logfile: path.to_string_lossy().into_owned(),
        })
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_appends_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        std::fs::write(&path, "existing\n").unwrap();

        let adapter = BasicAdapter::open(BasicConfig {
            logfile: path.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();
        adapter
            .log(&LogRecord {
                subject: "service.create".to_string(),
                message: "done".to_string(),
                level: "info".to_string(),
                user: "alice".to_string(),
            })
            .await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("existing\n"));
        assert!(contents.contains("level=info user=alice : service.create  'done'"));
    }

    #[tokio::test]
    async fn test_manage_writes_redacted_traffic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        std::fs::write(&path, "").unwrap();
        let bus = MemoryBus::new();

        let mut adapter = BasicAdapter::open(BasicConfig {
            logfile: path.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();
        adapter
            .manage(Arc::new(bus.clone()), &ADAPTER_PATTERNS, redactor())
            .await
            .unwrap();

        bus.publish("logger.log", br#"{"subject":"skipped"}"#.to_vec())
            .await
            .unwrap();
        bus.publish(
            "service.create",
            br#"{"datacenter_password":"p@55w0rd","name":"test"}"#.to_vec(),
        )
        .await
        .unwrap();

        let contents = wait_for_line(&path, "service.create").await;
        assert!(contents.contains(
            r#"level=debug user=system : service.create  '{"datacenter_password":"[OBFUSCATED]","name":"test"}'"#
        ));
        assert!(!contents.contains("skipped"));

        adapter.stop().await;
        assert_eq!(bus.subscription_count(), 0);
    }
}
