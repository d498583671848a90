//! Matches push-payment confirmations to pending transactions.
//!
//! Matching runs in two stages. The callback's `CheckoutRequestID` is
//! compared with the token stored on every transaction. When that finds
//! nothing, the phone number and amount from the callback metadata are used
//! to pick the newest `PENDING` transaction for that pair. The heuristic can
//! choose the wrong one when a number has several identical prompts open,
//! so the candidate list is reported with the outcome.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{
    Catalog, ProvisionResult, StkCallback, Transaction, TransactionStatus,
};
use crate::ports::{Provisioner, StoreError};
use crate::store::{Ledger, LedgerChange, TransactionStore, Update};

/// Where a callback landed in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    MatchedByToken {
        phone: String,
        index: usize,
    },
    MatchedByHeuristic {
        phone: String,
        index: usize,
        /// Ids of every pending transaction that fit, oldest first.
        candidates: Vec<String>,
    },
    Unmatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Token,
    Heuristic { candidates: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Payload was not an STK callback.
    Ignored,
    Unmatched {
        checkout_request_id: Option<String>,
    },
    /// The matched transaction was already terminal; nothing changed.
    AlreadySettled {
        tx_id: String,
        status: TransactionStatus,
    },
    Settled {
        tx_id: String,
        phone: String,
        status: TransactionStatus,
        matched_by: MatchKind,
        provision: Option<ProvisionResult>,
    },
}

/// Finds the transaction a callback refers to.
pub fn locate(ledger: &Ledger, callback: &StkCallback) -> MatchOutcome {
    if let Some(token) = callback.checkout_request_id.as_deref() {
        for (phone, list) in ledger {
            if let Some(index) = list
                .iter()
                .position(|tx| tx.correlation_token() == Some(token))
            {
                return MatchOutcome::MatchedByToken {
                    phone: phone.clone(),
                    index,
                };
            }
        }
    }

    let (Some(amount), Some(phone)) = (callback.amount(), callback.phone()) else {
        return MatchOutcome::Unmatched;
    };
    if !phone.is_canonical() {
        tracing::warn!(phone = %phone, "Fallback match on unrecognized phone format");
    }

    let Some(list) = ledger.get(phone.as_str()) else {
        return MatchOutcome::Unmatched;
    };
    let candidates: Vec<usize> = list
        .iter()
        .enumerate()
        .filter(|(_, tx)| tx.status == TransactionStatus::Pending && tx.amount == amount)
        .map(|(index, _)| index)
        .collect();

    match candidates.last() {
        Some(&index) => MatchOutcome::MatchedByHeuristic {
            phone: phone.into_string(),
            index,
            candidates: candidates.iter().map(|&i| list[i].id.clone()).collect(),
        },
        None => MatchOutcome::Unmatched,
    }
}

#[derive(Clone)]
pub struct CallbackReconciler {
    catalog: Arc<Catalog>,
    store: Arc<TransactionStore>,
    provisioner: Arc<dyn Provisioner>,
    /// Provisioning outcomes whose save failed, by transaction id. A
    /// provider retry of the same callback records them without
    /// provisioning again. Lost on restart.
    unrecorded: Arc<Mutex<HashMap<String, ProvisionResult>>>,
}

impl CallbackReconciler {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<TransactionStore>,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        Self {
            catalog,
            store,
            provisioner,
            unrecorded: Arc::default(),
        }
    }

    /// Applies a confirmation payload. Only storage failures are errors;
    /// unrecognized or unmatched payloads are reported as outcomes.
    pub async fn reconcile(&self, payload: &Value) -> Result<Reconciliation, StoreError> {
        let Some(callback) = StkCallback::from_payload(payload) else {
            tracing::info!("Unhandled M-PESA callback body, acknowledging");
            return Ok(Reconciliation::Ignored);
        };

        let settled = self
            .store
            .update(|ledger| settle(ledger, &callback))
            .await?;

        let (tx, matched_by) = match settled {
            Settlement::Unmatched => {
                tracing::warn!(
                    checkout_request_id = callback.checkout_request_id.as_deref().unwrap_or("-"),
                    amount = ?callback.amount(),
                    "No matching transaction found for STK callback"
                );
                return Ok(Reconciliation::Unmatched {
                    checkout_request_id: callback.checkout_request_id,
                });
            }
            Settlement::AlreadySettled(tx) => {
                if tx.provision.is_none() {
                    self.record_unrecorded(&tx).await?;
                }
                tracing::warn!(
                    tx_id = %tx.id,
                    status = %tx.status,
                    "Callback for already settled transaction ignored"
                );
                return Ok(Reconciliation::AlreadySettled {
                    tx_id: tx.id,
                    status: tx.status,
                });
            }
            Settlement::Transitioned(tx, matched_by) => (tx, matched_by),
        };

        tracing::info!(
            tx_id = %tx.id,
            status = %tx.status,
            result_code = ?tx.result_code,
            matched_by = ?matched_by,
            "Transaction settled"
        );

        let provision = if tx.status == TransactionStatus::Success {
            Some(self.provision(&tx).await?)
        } else {
            None
        };

        Ok(Reconciliation::Settled {
            tx_id: tx.id,
            phone: tx.phone,
            status: tx.status,
            matched_by,
            provision,
        })
    }

    /// Calls the provisioner outside the store lock and records its outcome.
    async fn provision(&self, tx: &Transaction) -> Result<ProvisionResult, StoreError> {
        let result = match self.catalog.find(&tx.package_id) {
            Some(package) => match self.provisioner.provision(&tx.phone, package).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(tx_id = %tx.id, "Provisioning failed: {}", e);
                    ProvisionResult {
                        success: false,
                        message: e.to_string(),
                    }
                }
            },
            None => {
                tracing::error!(tx_id = %tx.id, package_id = %tx.package_id, "Paid for unknown package");
                ProvisionResult {
                    success: false,
                    message: format!("Unknown package {}", tx.package_id),
                }
            }
        };

        tracing::info!(tx_id = %tx.id, success = result.success, "Provisioning result: {}", result.message);
        if let Err(e) = self.record(tx, result.clone()).await {
            self.unrecorded.lock().await.insert(tx.id.clone(), result);
            return Err(e);
        }
        Ok(result)
    }

    /// Saves a provisioning outcome kept from an earlier failed save.
    async fn record_unrecorded(&self, tx: &Transaction) -> Result<(), StoreError> {
        let Some(result) = self.unrecorded.lock().await.remove(&tx.id) else {
            return Ok(());
        };

        match self.record(tx, result.clone()).await {
            Ok(()) => {
                tracing::info!(tx_id = %tx.id, "Recorded provisioning result from earlier attempt");
                Ok(())
            }
            Err(e) => {
                self.unrecorded.lock().await.insert(tx.id.clone(), result);
                Err(e)
            }
        }
    }

    async fn record(&self, tx: &Transaction, result: ProvisionResult) -> Result<(), StoreError> {
        self.store
            .update(|ledger| {
                let target = ledger
                    .get_mut(&tx.phone)
                    .and_then(|list| list.iter_mut().find(|t| t.id == tx.id));
                match target {
                    Some(target) => {
                        target.provision = Some(result);
                        Update::Persist(())
                    }
                    None => Update::Unchanged(()),
                }
            })
            .await
    }
}

enum Settlement {
    Unmatched,
    AlreadySettled(Transaction),
    Transitioned(Transaction, MatchKind),
}

fn settle(ledger: &mut LedgerChange<'_>, callback: &StkCallback) -> Update<Settlement> {
    let (phone, index, matched_by) = match locate(ledger, callback) {
        MatchOutcome::Unmatched => return Update::Unchanged(Settlement::Unmatched),
        MatchOutcome::MatchedByToken { phone, index } => (phone, index, MatchKind::Token),
        MatchOutcome::MatchedByHeuristic {
            phone,
            index,
            candidates,
        } => {
            if candidates.len() > 1 {
                tracing::warn!(
                    candidates = ?candidates,
                    "Several pending transactions fit the callback, picking the newest"
                );
            }
            (
                phone,
                index,
                MatchKind::Heuristic {
                    candidates: candidates.len(),
                },
            )
        }
    };

    match ledger.get(&phone).and_then(|list| list.get(index)) {
        None => return Update::Unchanged(Settlement::Unmatched),
        Some(tx) if tx.is_terminal() => {
            return Update::Unchanged(Settlement::AlreadySettled(tx.clone()))
        }
        Some(_) => {}
    }

    let Some(tx) = ledger.get_mut(&phone).and_then(|list| list.get_mut(index)) else {
        return Update::Unchanged(Settlement::Unmatched);
    };

    tx.settle(
        callback.result_code,
        callback.result_desc.clone(),
        callback.raw.clone(),
    );
    Update::Persist(Settlement::Transitioned(tx.clone(), matched_by))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Package;
    use serde_json::json;

    fn pkg(price: u32) -> Package {
        Package::new("p_sh19", "Sh19 - 1GB (1hr)", price, "1hr", false)
    }

    fn pending(phone: &str, token: &str, price: u32) -> Transaction {
        Transaction::pending(phone.into(), &pkg(price), json!({ "CheckoutRequestID": token }))
    }

    fn callback(token: Option<&str>, amount: u32, phone: &str) -> StkCallback {
        let mut body = json!({
            "ResultCode": 0,
            "ResultDesc": "ok",
            "CallbackMetadata": { "Item": [
                { "Name": "Amount", "Value": amount },
                { "Name": "PhoneNumber", "Value": phone }
            ]}
        });
        if let Some(token) = token {
            body["CheckoutRequestID"] = json!(token);
        }
        StkCallback::from_payload(&json!({ "Body": { "stkCallback": body } })).unwrap()
    }

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.insert(
            "254700000001".into(),
            vec![pending("254700000001", "ws_A", 19)],
        );
        ledger.insert(
            "254712345678".into(),
            vec![
                pending("254712345678", "ws_B", 19),
                pending("254712345678", "ws_C", 19),
                pending("254712345678", "ws_D", 50),
            ],
        );
        ledger
    }

    #[test]
    fn token_match_wins() {
        let outcome = locate(&ledger(), &callback(Some("ws_C"), 50, "254700000001"));
        assert_eq!(
            outcome,
            MatchOutcome::MatchedByToken {
                phone: "254712345678".into(),
                index: 1
            }
        );
    }

    #[test]
    fn fallback_picks_newest_pending_with_amount() {
        let ledger = ledger();
        let outcome = locate(&ledger, &callback(None, 19, "0712345678"));
        let ids: Vec<String> = ledger["254712345678"][..2].iter().map(|t| t.id.clone()).collect();
        assert_eq!(
            outcome,
            MatchOutcome::MatchedByHeuristic {
                phone: "254712345678".into(),
                index: 1,
                candidates: ids
            }
        );
    }

    #[test]
    fn unknown_token_falls_back() {
        let outcome = locate(&ledger(), &callback(Some("ws_missing"), 50, "254712345678"));
        assert!(matches!(
            outcome,
            MatchOutcome::MatchedByHeuristic { index: 2, .. }
        ));
    }

    #[test]
    fn fallback_skips_settled_transactions() {
        let mut ledger = ledger();
        ledger.get_mut("254712345678").unwrap()[1].status = TransactionStatus::Failed;
        let outcome = locate(&ledger, &callback(None, 19, "254712345678"));
        assert!(matches!(
            outcome,
            MatchOutcome::MatchedByHeuristic { index: 0, ref candidates, .. } if candidates.len() == 1
        ));
    }

    #[test]
    fn nothing_fits() {
        assert_eq!(
            locate(&ledger(), &callback(None, 99, "254712345678")),
            MatchOutcome::Unmatched
        );
        assert_eq!(
            locate(&ledger(), &callback(None, 19, "254799999999")),
            MatchOutcome::Unmatched
        );
    }

    #[test]
    fn settle_does_not_touch_terminal_transactions() {
        let mut ledger = ledger();
        ledger.get_mut("254700000001").unwrap()[0].status = TransactionStatus::Success;

        let update = settle(
            &mut LedgerChange::new(&mut ledger),
            &callback(Some("ws_A"), 19, "254700000001"),
        );
        assert!(matches!(
            update,
            Update::Unchanged(Settlement::AlreadySettled(_))
        ));
        assert!(ledger["254700000001"][0].confirmation.is_none());
    }
}
