//! Control-plane service
//!
//! Wires the registry, the router and the secret directory to the bus. One
//! task per subscription; every task stops when the service token is
//! cancelled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use logrelay_adapters::StreamHub;
use logrelay_bus::{Bus, BusMessage, MessageStream, respond};
use logrelay_core::LogRecord;
use logrelay_core::subject::{
    DIRECTORY_FIND, DIRECTORY_UPDATE, LOGGER_DEL, LOGGER_FIND, LOGGER_LOG, LOGGER_SET,
    LOGS_STREAM, ROUTER_PATTERN,
};
use logrelay_security::{
    BusSecretSource, CredentialHolder, Redactor, SecretDirectory, SecretSource,
};
use logrelay_storage::StateStore;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RegistryError, ServiceError};
use crate::registry::Registry;
use crate::router::Router;

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Log file of the basic adapter created when none was persisted
    pub default_log_file: PathBuf,
    pub state_dir: PathBuf,
    pub find_subject: String,
    pub update_subject: String,
    pub directory_timeout: Duration,
    pub retry_interval: Duration,
}

impl ServiceOptions {
    pub fn new(default_log_file: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_log_file: default_log_file.into(),
            state_dir: state_dir.into(),
            find_subject: DIRECTORY_FIND.to_string(),
            update_subject: DIRECTORY_UPDATE.to_string(),
            directory_timeout: Duration::from_secs(1),
            retry_interval: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Set,
    Delete,
    Find,
    Log,
    DirectoryUpdate,
    Route,
}

pub struct Service {
    bus: Arc<dyn Bus>,
    hub: StreamHub,
    directory: Arc<SecretDirectory>,
    registry: Arc<Registry>,
    router: Router,
    options: ServiceOptions,
}

impl Service {
    /// Service whose secret directory is queried over the bus.
    pub fn new(bus: Arc<dyn Bus>, hub: StreamHub, options: ServiceOptions) -> Self {
        let source = BusSecretSource::new(
            Arc::clone(&bus),
            options.find_subject.clone(),
            options.directory_timeout,
        );
        Self::with_source(bus, hub, Arc::new(source), options)
    }

    pub fn with_source(
        bus: Arc<dyn Bus>,
        hub: StreamHub,
        source: Arc<dyn SecretSource>,
        options: ServiceOptions,
    ) -> Self {
        let directory = Arc::new(SecretDirectory::new(source));
        let redactor = Redactor::new(Arc::clone(&directory));
        let store = StateStore::in_dir(&options.state_dir);
        let registry = Arc::new(Registry::new(
            Arc::clone(&bus),
            redactor.clone(),
            hub.clone(),
            store,
        ));
        let router = Router::new(redactor, hub.clone());

        Self {
            bus,
            hub,
            directory,
            registry,
            router,
            options,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn hub(&self) -> &StreamHub {
        &self.hub
    }

    /// Start the service and run until `token` is cancelled.
    pub async fn run(self: Arc<Self>, token: CancellationToken) -> Result<(), ServiceError> {
        let running = match self.start(token.clone()).await {
            Ok(running) => running,
            Err(ServiceError::Cancelled) => return Ok(()),
            Err(err) => return Err(err),
        };
        token.cancelled().await;
        running.shutdown().await;
        Ok(())
    }

    /// Wait for the directory, restore adapters and subscribe the control plane.
    pub async fn start(self: &Arc<Self>, token: CancellationToken) -> Result<Running, ServiceError> {
        self.wait_for_directory(&token).await?;
        self.registry
            .load_persisted(&self.options.default_log_file)
            .await?;
        self.hub.open(LOGS_STREAM);

        let controls = [
            (LOGGER_SET, Control::Set),
            (LOGGER_DEL, Control::Delete),
            (LOGGER_FIND, Control::Find),
            (LOGGER_LOG, Control::Log),
            (self.options.update_subject.as_str(), Control::DirectoryUpdate),
            (ROUTER_PATTERN, Control::Route),
        ];

        let mut running = Running {
            token: token.child_token(),
            tasks: Vec::with_capacity(controls.len()),
            registry: Arc::clone(&self.registry),
        };
        for (subject, control) in controls {
            let stream = match self.bus.subscribe(subject).await {
                Ok(stream) => stream,
                Err(err) => {
                    running.shutdown().await;
                    return Err(err.into());
                }
            };
            let service = Arc::clone(self);
            let token = running.token.clone();
            running.tasks.push(tokio::spawn(async move {
                service.serve(control, stream, token).await;
            }));
        }

        info!("logrelay service started");
        Ok(running)
    }

    async fn wait_for_directory(&self, token: &CancellationToken) -> Result<(), ServiceError> {
        loop {
            match self.directory.literals().await {
                Ok(literals) => {
                    info!(literals = literals.len(), "secret directory available");
                    return Ok(());
                }
                Err(err) => warn!(error = %err, "could not get secrets"),
            }
            tokio::select! {
                _ = token.cancelled() => return Err(ServiceError::Cancelled),
                _ = tokio::time::sleep(self.options.retry_interval) => {}
            }
        }
    }

    async fn serve(&self, control: Control, mut stream: MessageStream, token: CancellationToken) {
        loop {
            let message = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = stream.next() => match next {
                    Some(message) => message,
                    None => break,
                },
            };
            self.handle(control, &message).await;
        }
        debug!(?control, "control subscription closed");
    }

    async fn handle(&self, control: Control, message: &BusMessage) {
        match control {
            Control::Set => {
                let reply = match self.registry.set(&message.payload).await {
                    Ok(config) => serde_json::to_vec(&config).map_err(|err| {
                        RegistryError::InvalidConfig(err.to_string())
                    }),
                    Err(err) => Err(err),
                };
                self.reply(message, reply).await;
            }
            Control::Delete => {
                let reply = self
                    .registry
                    .delete(&message.payload)
                    .await
                    .map(|()| b"null".to_vec());
                self.reply(message, reply).await;
            }
            Control::Find => {
                let configs = self.registry.find().await;
                let reply = serde_json::to_vec(&configs)
                    .map_err(|err| RegistryError::InvalidConfig(err.to_string()));
                self.reply(message, reply).await;
            }
            Control::Log => match serde_json::from_slice::<LogRecord>(&message.payload) {
                Ok(record) => self.registry.dispatch_log(&record).await,
                Err(err) => warn!(error = %err, "malformed logger.log record"),
            },
            Control::DirectoryUpdate => {
                match serde_json::from_slice::<CredentialHolder>(&message.payload) {
                    Ok(record) => {
                        self.directory.merge(&record).await;
                    }
                    Err(err) => {
                        // Nothing to merge; refetch everything on next use
                        warn!(error = %err, "malformed directory update, dropping cached secrets");
                        self.directory.invalidate().await;
                    }
                }
            }
            Control::Route => {
                self.router.route(message).await;
            }
        }
    }

    async fn reply(&self, message: &BusMessage, reply: Result<Vec<u8>, RegistryError>) {
        let body = match reply {
            Ok(body) => body,
            Err(err) => {
                warn!(subject = %message.subject, error = %err, "control request failed");
                error_body(&err)
            }
        };
        if let Err(err) = respond(self.bus.as_ref(), message, body).await {
            warn!(subject = %message.subject, error = %err, "could not reply");
        }
    }
}

fn error_body(err: &RegistryError) -> Vec<u8> {
    json!({ "error": err.to_string() }).to_string().into_bytes()
}

/// Handle on a started service.
pub struct Running {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    registry: Arc<Registry>,
}

impl Running {
    /// Cancel the control subscriptions and stop every adapter.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "control task failed");
            }
        }
        self.registry.shutdown().await;
        info!("logrelay service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body() {
        let body = error_body(&RegistryError::BasicNotOptional);
        assert_eq!(body, br#"{"error":"Basic logger is not optional"}"#.to_vec());
    }
}
