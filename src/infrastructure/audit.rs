//! Audit sink implementations

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::infrastructure::error::AuditError;
use crate::infrastructure::traits::{AuditEvent, AuditSink, Severity};

/// Emits audit events as `tracing` events on the `audit` target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let actor = event
            .actor_id
            .as_ref()
            .map(|a| a.as_str())
            .unwrap_or("-");
        match event.severity {
            Severity::Info => info!(
                target: "audit",
                actor = %actor,
                entity_type = event.entity_type,
                entity_id = %event.entity_id,
                details = %event.details,
                "{}",
                event.action
            ),
            Severity::Warning | Severity::Critical => warn!(
                target: "audit",
                actor = %actor,
                entity_type = event.entity_type,
                entity_id = %event.entity_id,
                severity = %event.severity,
                details = %event.details,
                "{}",
                event.action
            ),
        }
        Ok(())
    }
}

/// Appends one JSON object per event to a file.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        }
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let line = serde_json::to_string(event)?;
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AuditError::Unavailable("audit log lock poisoned".into()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Keeps events in memory; can be switched to fail every call.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
    failing: bool,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every event.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        if self.failing {
            return Err(AuditError::Unavailable("sink configured to fail".into()));
        }
        self.events
            .lock()
            .map_err(|_| AuditError::Unavailable("recorder lock poisoned".into()))?
            .push(event.clone());
        Ok(())
    }
}
