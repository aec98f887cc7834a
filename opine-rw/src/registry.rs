//! In-memory wizard session registry
//!
//! Holds one live `WizardEngine` per open wizard session, keyed by a
//! process-scoped id the client carries in memory only. Losing the id (a
//! page reload) abandons the session's step and answers; completion remains
//! durable through the session manager and replay guard.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::wizard::WizardEngine;

#[derive(Clone, Default)]
pub struct WizardRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<WizardEngine>>>>>,
}

impl WizardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new wizard session, returning its id
    pub async fn insert(&self, engine: WizardEngine) -> Uuid {
        let wizard_id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(wizard_id, Arc::new(Mutex::new(engine)));
        wizard_id
    }

    /// Look up a live wizard session. Callers lock the returned engine for
    /// the duration of one operation; the lock also serializes a stray
    /// concurrent submit against the same session.
    pub async fn get(&self, wizard_id: Uuid) -> Option<Arc<Mutex<WizardEngine>>> {
        self.sessions.read().await.get(&wizard_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
