use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::ports::{StoreResult, TransactionPersistence};
use crate::store::Ledger;

/// Persistence that keeps the last saved snapshot in memory.
///
/// Clones share the snapshot, which lets tests "restart" a store by opening
/// a new one over the same persistence.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    snapshot: Arc<Mutex<Ledger>>,
    saves: Arc<Mutex<usize>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed saves.
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Ledger {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl TransactionPersistence for InMemoryPersistence {
    async fn load(&self) -> StoreResult<Ledger> {
        Ok(self.snapshot())
    }

    async fn save(&self, ledger: &Ledger) -> StoreResult<()> {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = ledger.clone();
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
