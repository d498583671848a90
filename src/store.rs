//! Transaction store: the shared ledger of purchase attempts.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::Transaction;
use crate::ports::{StoreResult, TransactionPersistence};

/// Normalized phone → transactions in the order they were appended.
pub type Ledger = BTreeMap<String, Vec<Transaction>>;

/// What a mutation closure did to the ledger.
pub enum Update<R> {
    /// The ledger changed and must be saved before the result is returned.
    Persist(R),
    Unchanged(R),
}

/// Mutable view handed to [`TransactionStore::update`] closures.
///
/// Reads go through `Deref<Target = Ledger>`. Writes must go through
/// [`list_mut`](Self::list_mut) or [`get_mut`](Self::get_mut), which keep a
/// copy of each phone's list the first time it is touched so the change can
/// be undone.
pub struct LedgerChange<'a> {
    ledger: &'a mut Ledger,
    undo: Vec<(String, Option<Vec<Transaction>>)>,
}

impl<'a> LedgerChange<'a> {
    pub(crate) fn new(ledger: &'a mut Ledger) -> Self {
        Self {
            ledger,
            undo: Vec::new(),
        }
    }

    /// The list for `phone`, created empty if the phone is new.
    pub fn list_mut(&mut self, phone: &str) -> &mut Vec<Transaction> {
        self.remember(phone);
        self.ledger.entry(phone.to_string()).or_default()
    }

    pub fn get_mut(&mut self, phone: &str) -> Option<&mut Vec<Transaction>> {
        if !self.ledger.contains_key(phone) {
            return None;
        }
        self.remember(phone);
        self.ledger.get_mut(phone)
    }

    fn remember(&mut self, phone: &str) {
        if self.undo.iter().any(|(touched, _)| touched == phone) {
            return;
        }
        let previous = self.ledger.get(phone).cloned();
        self.undo.push((phone.to_string(), previous));
    }

    fn rollback(self) {
        let LedgerChange { ledger, undo } = self;
        for (phone, previous) in undo {
            match previous {
                Some(list) => {
                    ledger.insert(phone, list);
                }
                None => {
                    ledger.remove(&phone);
                }
            }
        }
    }
}

impl Deref for LedgerChange<'_> {
    type Target = Ledger;

    fn deref(&self) -> &Ledger {
        self.ledger
    }
}

/// Single-writer ledger with a persisted snapshot.
///
/// Every mutation runs under one lock together with its save. If the save
/// fails the touched lists are restored, so memory never runs ahead of
/// what is on disk. Callers must not hold provider or provisioning calls
/// inside a mutation closure.
pub struct TransactionStore {
    ledger: Mutex<Ledger>,
    persistence: Arc<dyn TransactionPersistence>,
}

impl TransactionStore {
    pub async fn open(persistence: Arc<dyn TransactionPersistence>) -> StoreResult<Self> {
        let ledger = persistence.load().await?;
        Ok(Self {
            ledger: Mutex::new(ledger),
            persistence,
        })
    }

    pub async fn append(&self, tx: Transaction) -> StoreResult<()> {
        self.update(|ledger| {
            let phone = tx.phone.clone();
            ledger.list_mut(&phone).push(tx);
            Update::Persist(())
        })
        .await
    }

    pub async fn update<R>(
        &self,
        f: impl FnOnce(&mut LedgerChange<'_>) -> Update<R>,
    ) -> StoreResult<R> {
        let mut ledger = self.ledger.lock().await;
        let mut change = LedgerChange::new(&mut ledger);

        match f(&mut change) {
            Update::Unchanged(result) => {
                change.rollback();
                Ok(result)
            }
            Update::Persist(result) => match self.persistence.save(&change).await {
                Ok(()) => Ok(result),
                Err(e) => {
                    tracing::error!("Failed to persist transactions, rolling back: {}", e);
                    change.rollback();
                    Err(e)
                }
            },
        }
    }

    /// Transactions recorded for one phone, oldest first.
    pub async fn history(&self, phone: &str) -> Vec<Transaction> {
        self.ledger
            .lock()
            .await
            .get(phone)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn snapshot(&self) -> Ledger {
        self.ledger.lock().await.clone()
    }

    /// Total number of transactions across all phones.
    pub async fn len(&self) -> usize {
        self.ledger.lock().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
