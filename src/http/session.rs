//! Session stores and scoped session access.
//!
//! # Responsibilities
//! - Open/close a session around dispatch in the admin context
//! - Persist a small per-session record between requests (file store)
//! - Guarantee the session is closed exactly once
//!
//! # Design Decisions
//! - Session IDs are UUIDs; anything else from the cookie is replaced
//! - `SessionGuard` closes on drop when the pass unwinds or returns early

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionSection;
use crate::failure::{AppError, Failure};
use crate::http::request::Request;

/// Cookie carrying the session ID.
pub const SESSION_COOKIE: &str = "anchor_session";

/// A session store bound to one session ID.
pub trait Session: Send {
    fn id(&self) -> &str;

    fn is_open(&self) -> bool;

    fn start(&mut self) -> Result<(), Failure>;

    fn close(&mut self) -> Result<(), Failure>;
}

/// Session that lives for one process.
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    open: bool,
}

impl MemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            open: false,
        }
    }
}

impl Session for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn start(&mut self) -> Result<(), Failure> {
        if self.open {
            return Err(Failure::new(AppError::Session(format!("session {} already started", self.id))));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Failure> {
        if !self.open {
            return Err(Failure::new(AppError::Session(format!("session {} is not open", self.id))));
        }
        self.open = false;
        Ok(())
    }
}

/// What the file store keeps per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub created_at: String,
    pub last_seen: String,
    pub hits: u64,
}

/// Session persisted as `<dir>/<id>.json`.
#[derive(Debug)]
pub struct FileSession {
    dir: PathBuf,
    id: String,
    record: Option<SessionRecord>,
}

impl FileSession {
    pub fn new(dir: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            id: id.into(),
            record: None,
        }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.id))
    }

    /// The record loaded by `start`, while the session is open.
    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    fn load(path: &Path) -> Result<Option<SessionRecord>, Failure> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let record = serde_json::from_str(&content).map_err(|e| {
            Failure::new(AppError::Session(format!("corrupt session file {}: {}", path.display(), e)))
        })?;
        Ok(Some(record))
    }
}

impl Session for FileSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.record.is_some()
    }

    fn start(&mut self) -> Result<(), Failure> {
        if self.record.is_some() {
            return Err(Failure::new(AppError::Session(format!("session {} already started", self.id))));
        }
        fs::create_dir_all(&self.dir)?;
        let now = Utc::now().to_rfc3339();
        let mut record = Self::load(&self.path())?.unwrap_or_else(|| SessionRecord {
            id: self.id.clone(),
            created_at: now.clone(),
            last_seen: now.clone(),
            hits: 0,
        });
        record.last_seen = now;
        record.hits += 1;
        self.record = Some(record);
        tracing::debug!(session_id = %self.id, "Session started");
        Ok(())
    }

    fn close(&mut self) -> Result<(), Failure> {
        let record = self.record.take().ok_or_else(|| {
            Failure::new(AppError::Session(format!("session {} is not open", self.id)))
        })?;
        let json = serde_json::to_string(&record)
            .map_err(|e| Failure::new(AppError::Session(e.to_string())))?;
        fs::write(self.path(), json)?;
        tracing::debug!(session_id = %self.id, hits = record.hits, "Session closed");
        Ok(())
    }
}

/// Pick the session store for a request: cookie ID if it is a UUID,
/// otherwise a fresh one.
pub fn store_for(config: &SessionSection, request: &Request) -> Box<dyn Session> {
    let id = request
        .cookie(SESSION_COOKIE)
        .and_then(|value| Uuid::parse_str(value).ok())
        .unwrap_or_else(Uuid::new_v4)
        .to_string();

    match &config.path {
        Some(dir) => Box::new(FileSession::new(dir, id)),
        None => Box::new(MemorySession::new(id)),
    }
}

/// Keeps a session open for a scope and closes it exactly once.
pub struct SessionGuard<'a> {
    session: Option<&'a mut dyn Session>,
}

impl<'a> SessionGuard<'a> {
    /// Start `session` and guard it.
    pub fn open(session: &'a mut dyn Session) -> Result<Self, Failure> {
        session.start()?;
        Ok(Self {
            session: Some(session),
        })
    }

    /// Close now, reporting any error.
    pub fn close(mut self) -> Result<(), Failure> {
        match self.session.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close() {
                tracing::error!(session_id = session.id(), error = %e, "Failed to close session");
            }
        }
    }
}
