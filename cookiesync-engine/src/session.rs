//! Page-load session context.
//!
//! Holds the state the consent gate, requestor and dispatcher share for one
//! page load: the sanitized configuration, the consent cell and the
//! sync-fired flag. Both cells are written at most once.

use cookiesync_types::{ConsentData, SessionId, SyncConfig};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared context for one page load.
#[derive(Debug)]
pub struct SyncSession {
    id: SessionId,
    config: SyncConfig,
    consent: OnceLock<ConsentData>,
    fired: AtomicBool,
}

impl SyncSession {
    /// Creates a session in the initial state: consent unknown, not fired.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            id: SessionId::new(),
            config,
            consent: OnceLock::new(),
            fired: AtomicBool::new(false),
        }
    }

    /// The session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The sanitized configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Consent data, once known.
    pub fn consent(&self) -> Option<&ConsentData> {
        self.consent.get()
    }

    /// Stores consent data. Returns `false` if consent was already known;
    /// the first value is kept.
    pub fn store_consent(&self, consent: ConsentData) -> bool {
        self.consent.set(consent).is_ok()
    }

    /// Claims the single sync firing. Returns `true` for exactly one caller
    /// per session.
    pub fn try_mark_fired(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Whether the sync has been fired.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
