//! Queue engine: enqueue commands now, execute them later.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use pbx_remote_client::{Session, SessionError};
use pbx_remote_core::item::now;
use pbx_remote_core::{
    Arguments, PbxConfig, QueueId, QueueItem, QueueResponse, QueueStorage, StorageError,
};
use tracing::{debug, info, warn};

use crate::commands::{BoundArgs, CommandRegistry};

/// Commands that are never queued by default: they belong to the
/// connection itself or block waiting for pushed events.
pub const DEFAULT_DENYLIST: [&str; 4] = ["Login", "Logoff", "Ping", "WaitEvent"];

/// Default time after which a claim on an item is considered abandoned.
pub const DEFAULT_CLAIM_TTL_SECS: i64 = 300;

/// Queue engine error.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("No queue storage has been configured")]
    NoProcessorConfigured,
    #[error("Command {0} is not allowed to be queued")]
    CommandNotQueueable(String),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Invalid arguments for {command}: {reason}")]
    InvalidArguments { command: String, reason: String },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Outcome counts of one [`QueueEngine::drain`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Items executed and stored.
    pub executed: usize,
    /// Items left pending after a failure.
    pub failed: usize,
    /// Items held by another worker.
    pub skipped: usize,
}

/// Deferred command queue over a pluggable storage backend.
pub struct QueueEngine {
    storage: Option<Arc<dyn QueueStorage>>,
    denylist: RwLock<HashSet<String>>,
    registry: CommandRegistry,
    claim_ttl_secs: i64,
}

impl Default for QueueEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueEngine {
    /// Create an engine without storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: None,
            denylist: RwLock::new(
                DEFAULT_DENYLIST
                    .iter()
                    .map(|c| c.to_ascii_lowercase())
                    .collect(),
            ),
            registry: CommandRegistry::standard(),
            claim_ttl_secs: DEFAULT_CLAIM_TTL_SECS,
        }
    }

    /// Create an engine backed by `storage`.
    #[must_use]
    pub fn with_storage(storage: Arc<dyn QueueStorage>) -> Self {
        let mut engine = Self::new();
        engine.set_storage(storage);
        engine
    }

    /// Apply queue settings from configuration.
    #[must_use]
    pub fn configured(mut self, config: &PbxConfig) -> Self {
        self.claim_ttl_secs = i64::try_from(config.claim_ttl_secs).unwrap_or(i64::MAX);
        self
    }

    /// Replace the command registry.
    #[must_use]
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Attach a storage backend.
    pub fn set_storage(&mut self, storage: Arc<dyn QueueStorage>) {
        self.storage = Some(storage);
    }

    /// The attached storage backend.
    #[must_use]
    pub fn storage(&self) -> Option<&Arc<dyn QueueStorage>> {
        self.storage.as_ref()
    }

    #[must_use]
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    fn require_storage(&self) -> Result<&Arc<dyn QueueStorage>, QueueError> {
        self.storage.as_ref().ok_or(QueueError::NoProcessorConfigured)
    }

    /// Forbid a command from being queued.
    ///
    /// Returns `false` if it already was.
    pub fn disallow(&self, command: &str) -> bool {
        self.denylist.write().insert(command.to_ascii_lowercase())
    }

    /// Allow a previously forbidden command.
    ///
    /// Returns `false` if it was not forbidden.
    pub fn allow(&self, command: &str) -> bool {
        self.denylist.write().remove(&command.to_ascii_lowercase())
    }

    /// Whether `command` may be queued, checking both the given name and the
    /// action it resolves to.
    #[must_use]
    pub fn is_queueable(&self, command: &str) -> bool {
        let denylist = self.denylist.read();
        if denylist.contains(&command.to_ascii_lowercase()) {
            return false;
        }
        self.registry.get(command).is_none_or(|spec| {
            !denylist.contains(&spec.action.to_ascii_lowercase())
                && !denylist.contains(&spec.name.to_ascii_lowercase())
        })
    }

    /// Store a command for later execution.
    ///
    /// # Errors
    /// Returns error if no storage is attached, the command is forbidden or
    /// unknown, an argument cannot be bound to its parameter, or the insert
    /// fails.
    pub async fn enqueue(&self, command: &str, arguments: Arguments) -> Result<QueueId, QueueError> {
        let storage = self.require_storage()?;

        if !self.is_queueable(command) {
            return Err(QueueError::CommandNotQueueable(command.to_string()));
        }

        let spec = self
            .registry
            .get(command)
            .ok_or_else(|| QueueError::UnknownCommand(command.to_string()))?;
        spec.validate(&arguments)
            .map_err(|reason| QueueError::InvalidArguments {
                command: command.to_string(),
                reason,
            })?;

        let id = storage.insert(&QueueItem::new(command, arguments)).await?;
        info!(id, command, "Queued command");
        Ok(id)
    }

    /// Execute every pending item against `session`, one at a time.
    ///
    /// Items whose command fails stay pending for the next sweep. A failing
    /// item never fails the sweep.
    ///
    /// # Errors
    /// Returns error if no storage is attached or pending items cannot be
    /// listed.
    pub async fn drain(&self, session: &Session) -> Result<DrainSummary, QueueError> {
        let storage = self.require_storage()?;
        let pending = storage.list_pending().await?;
        let mut summary = DrainSummary::default();

        debug!(count = pending.len(), "Draining command queue");

        for mut item in pending {
            let Some(id) = item.id else {
                summary.skipped += 1;
                continue;
            };

            let claimed_at = now();
            match storage
                .claim(id, claimed_at, claimed_at.saturating_sub(self.claim_ttl_secs))
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(id, "Queue item held by another worker");
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(id, error = %e, "Failed to claim queue item");
                    summary.failed += 1;
                    continue;
                }
            }

            match self.execute(session, &item).await {
                Ok(Some(response)) => {
                    item.mark_executed(response, now());
                    match storage.update(&item).await {
                        Ok(()) => {
                            info!(id, command = %item.command, "Executed queued command");
                            summary.executed += 1;
                        }
                        Err(e) => {
                            warn!(id, error = %e, "Failed to store queue item response");
                            Self::release(storage.as_ref(), id).await;
                            summary.failed += 1;
                        }
                    }
                }
                Ok(None) => {
                    info!(id, command = %item.command, "Queued command failed, left pending");
                    Self::release(storage.as_ref(), id).await;
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!(id, command = %item.command, error = %e, "Queued command errored, left pending");
                    Self::release(storage.as_ref(), id).await;
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn execute(
        &self,
        session: &Session,
        item: &QueueItem,
    ) -> Result<Option<QueueResponse>, QueueError> {
        let spec = self
            .registry
            .get(&item.command)
            .ok_or_else(|| QueueError::UnknownCommand(item.command.clone()))?;
        let args = BoundArgs::new(spec, &item.arguments);
        Ok((spec.handler)(session, args).await?)
    }

    async fn release(storage: &dyn QueueStorage, id: QueueId) {
        if let Err(e) = storage.release(id).await {
            warn!(id, error = %e, "Failed to release queue item");
        }
    }

    /// Stored result of an executed item.
    ///
    /// `None` for unknown ids and items still pending.
    ///
    /// # Errors
    /// Returns error if no storage is attached or the fetch fails.
    pub async fn retrieve_response(&self, id: QueueId) -> Result<Option<QueueResponse>, QueueError> {
        let storage = self.require_storage()?;
        Ok(storage.fetch(id).await?.and_then(|item| item.response))
    }
}
