//! JSON file implementation of TransactionPersistence.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use crate::ports::{StoreResult, TransactionPersistence};
use crate::store::Ledger;

/// Keeps the whole ledger in one pretty-printed JSON document keyed by phone.
///
/// Saves go through a sibling `.tmp` file and a rename, so a crash mid-write
/// leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TransactionPersistence for JsonFilePersistence {
    async fn load(&self) -> StoreResult<Ledger> {
        if !fs::try_exists(&self.path).await? {
            tracing::info!("No transaction file at {}, starting empty", self.path.display());
            return Ok(Ledger::new());
        }

        let raw = fs::read(&self.path).await?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Ledger::new());
        }

        let ledger: Ledger = serde_json::from_slice(&raw)?;
        tracing::info!(
            phones = ledger.len(),
            "Loaded transactions from {}",
            self.path.display()
        );
        Ok(ledger)
    }

    async fn save(&self, ledger: &Ledger) -> StoreResult<()> {
        let body = serde_json::to_vec_pretty(ledger)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, &body).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
