// ⚖️ Transaction Processor - balance/limit invariant + atomic apply
//
// Stateless: every call reads the current balance inside its own atomic unit,
// checks the projected balance against the account's limit tier, then writes
// the transaction row and the balance change together.

use chrono::Utc;

use crate::context::RequestContext;
use crate::db::{self, Store};
use crate::entities::{LimitTiers, Transaction};
use crate::error::{Result, WalletError};

#[derive(Debug, Clone)]
pub struct TransactionProcessor {
    store: Store,
    limits: LimitTiers,
}

/// `balance + amount` if it stays within `[0, limit]`
pub fn project_balance(balance: i64, amount: i64, limit: i64) -> Result<i64> {
    let out_of_limit = || WalletError::OutOfLimit { balance, amount, limit };

    let projected = balance.checked_add(amount).ok_or_else(out_of_limit)?;
    if projected < 0 || projected > limit {
        return Err(out_of_limit());
    }
    Ok(projected)
}

impl TransactionProcessor {
    pub fn new(store: Store, limits: LimitTiers) -> Self {
        TransactionProcessor { store, limits }
    }

    /// Apply `amount` to `acc_id`.
    ///
    /// A zero amount is accepted and records a no-op transaction. On any error
    /// nothing is written. A cancelled or expired context fails as `Internal`.
    pub fn apply(&self, ctx: &RequestContext, acc_id: i64, amount: i64) -> Result<Transaction> {
        let _span = ctx.span().enter();
        ctx.ensure_active()?;

        let result = self.store.atomic(|tx| {
            let account = db::get_account(tx, acc_id)?;
            let limit = account.limit(&self.limits);
            let projected = project_balance(account.balance, amount, limit)?;

            let (id, created) = db::insert_transaction(tx, acc_id, amount, Utc::now())?;
            db::update_balance(tx, acc_id, amount)?;

            // Last chance to back out before the commit
            ctx.ensure_active()?;

            tracing::debug!(acc_id, amount, projected, "transaction staged");
            Ok(Transaction { id, acc_id, amount, created })
        });

        match &result {
            Ok(committed) => {
                tracing::info!(tx_id = committed.id, acc_id, amount, "transaction applied");
            }
            Err(WalletError::OutOfLimit { balance, limit, .. }) => {
                tracing::info!(acc_id, amount, balance, limit, "transaction rejected: out of limit");
            }
            Err(WalletError::NotFound) => {
                tracing::info!(acc_id, "transaction rejected: account not found");
            }
            Err(_) => {}
        }

        result
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Store,
        processor: TransactionProcessor,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("wallet.db"), Duration::from_secs(10)).unwrap();
        let processor = TransactionProcessor::new(store.clone(), LimitTiers::default());
        Fixture { _dir: dir, store, processor }
    }

    fn new_account(store: &Store, phone: &str) -> i64 {
        let conn = store.connection().unwrap();
        db::insert_account(&conn, "tester", phone, "hash", Utc::now()).unwrap().id
    }

    fn balance(store: &Store, acc_id: i64) -> i64 {
        db::get_account(&store.connection().unwrap(), acc_id).unwrap().balance
    }

    fn tx_count(store: &Store, acc_id: i64) -> i64 {
        db::count_transactions(&store.connection().unwrap(), acc_id).unwrap()
    }

    #[test]
    fn test_project_balance_bounds() {
        assert_eq!(project_balance(0, 1_000_000, 1_000_000).unwrap(), 1_000_000);
        assert_eq!(project_balance(500, -500, 1_000).unwrap(), 0);
        assert!(project_balance(500, -600, 1_000).is_err());
        assert!(project_balance(1_000, 1, 1_000).is_err());
        assert!(project_balance(i64::MAX, 1, i64::MAX).is_err());
    }

    #[test]
    fn test_returned_transaction_matches_stored_row() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        let ctx = RequestContext::new(Some(acc));

        let applied: Vec<Transaction> = (0..20).map(|_| f.processor.apply(&ctx, acc, 1).unwrap()).collect();

        let conn = f.store.connection().unwrap();
        let stored = db::list_transactions_in_month(&conn, acc, Utc::now()).unwrap();
        assert_eq!(stored.len(), applied.len());
        for (returned, row) in applied.iter().zip(&stored) {
            assert_eq!(returned, row);
        }
    }

    #[test]
    fn test_unidentified_cap_scenario() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        let ctx = RequestContext::new(Some(acc));

        let tx = f.processor.apply(&ctx, acc, 1_000_000).unwrap();
        assert_eq!(tx.acc_id, acc);
        assert_eq!(tx.amount, 1_000_000);
        assert!(tx.id > 0);
        assert_eq!(balance(&f.store, acc), 1_000_000);

        let over = f.processor.apply(&ctx, acc, 1);
        assert!(matches!(over, Err(WalletError::OutOfLimit { limit: 1_000_000, .. })));
        assert_eq!(balance(&f.store, acc), 1_000_000);
        assert_eq!(tx_count(&f.store, acc), 1);
    }

    #[test]
    fn test_debit_below_zero_scenario() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        let ctx = RequestContext::new(Some(acc));

        f.processor.apply(&ctx, acc, 500).unwrap();
        let result = f.processor.apply(&ctx, acc, -600);

        assert!(matches!(result, Err(WalletError::OutOfLimit { balance: 500, amount: -600, .. })));
        assert_eq!(balance(&f.store, acc), 500);
        assert_eq!(tx_count(&f.store, acc), 1);
    }

    #[test]
    fn test_identified_account_gets_higher_tier() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        db::set_identified(&f.store.connection().unwrap(), acc).unwrap();
        let ctx = RequestContext::new(Some(acc));

        f.processor.apply(&ctx, acc, 5_000_000).unwrap();
        f.processor.apply(&ctx, acc, 5_000_000).unwrap();
        assert!(f.processor.apply(&ctx, acc, 1).is_err());

        assert_eq!(balance(&f.store, acc), 10_000_000);
    }

    #[test]
    fn test_missing_account_is_not_found() {
        let f = fixture();
        let ctx = RequestContext::background();

        assert!(matches!(f.processor.apply(&ctx, 999, 10), Err(WalletError::NotFound)));
    }

    #[test]
    fn test_zero_amount_records_noop_transaction() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        let ctx = RequestContext::new(Some(acc));

        let tx = f.processor.apply(&ctx, acc, 0).unwrap();

        assert_eq!(tx.amount, 0);
        assert_eq!(balance(&f.store, acc), 0);
        assert_eq!(tx_count(&f.store, acc), 1);
    }

    #[test]
    fn test_balance_equals_sum_of_applied_amounts() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        let ctx = RequestContext::new(Some(acc));
        let amounts = [300, -100, 700_000, -200, 0, 299_999, -1, 2, -999_999, 5];

        let mut expected = 0;
        for amount in amounts {
            match f.processor.apply(&ctx, acc, amount) {
                Ok(_) => expected += amount,
                Err(WalletError::OutOfLimit { .. }) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
            let current = balance(&f.store, acc);
            assert!((0..=1_000_000).contains(&current));
            assert_eq!(current, expected);
        }

        let conn = f.store.connection().unwrap();
        assert_eq!(db::sum_transactions(&conn, acc).unwrap(), expected);
    }

    #[test]
    fn test_same_request_twice_applies_twice() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        let ctx = RequestContext::new(Some(acc));

        let first = f.processor.apply(&ctx, acc, 250).unwrap();
        let second = f.processor.apply(&ctx, acc, 250).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(balance(&f.store, acc), 500);
        assert_eq!(tx_count(&f.store, acc), 2);
    }

    #[test]
    fn test_cancelled_context_applies_nothing() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        let ctx = RequestContext::new(Some(acc));
        ctx.cancel();

        let result = f.processor.apply(&ctx, acc, 100);

        assert!(matches!(result, Err(ref e) if e.is_internal()));
        assert_eq!(balance(&f.store, acc), 0);
        assert_eq!(tx_count(&f.store, acc), 0);
    }

    #[test]
    fn test_concurrent_debits_cannot_both_pass() {
        let f = fixture();
        let acc = new_account(&f.store, "+1");
        let ctx = RequestContext::new(Some(acc));
        f.processor.apply(&ctx, acc, 1_000).unwrap();

        for _round in 0..5 {
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let processor = f.processor.clone();
                    let barrier = barrier.clone();
                    let ctx = RequestContext::new(Some(acc));
                    thread::spawn(move || {
                        barrier.wait();
                        processor.apply(&ctx, acc, -600)
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let ok = results.iter().filter(|r| r.is_ok()).count();
            let rejected = results
                .iter()
                .filter(|r| matches!(r, Err(WalletError::OutOfLimit { .. })))
                .count();

            assert_eq!((ok, rejected), (1, 1), "results: {:?}", results);
            assert_eq!(balance(&f.store, acc), 400);

            // Top back up for the next round
            f.processor.apply(&ctx, acc, 600).unwrap();
        }
    }

    #[test]
    fn test_different_accounts_proceed_independently() {
        let f = fixture();
        let accounts: Vec<i64> = (0..4).map(|i| new_account(&f.store, &format!("+{}", i))).collect();

        let handles: Vec<_> = accounts
            .iter()
            .map(|&acc| {
                let processor = f.processor.clone();
                thread::spawn(move || {
                    let ctx = RequestContext::new(Some(acc));
                    for _ in 0..10 {
                        processor.apply(&ctx, acc, 100).unwrap();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        for acc in accounts {
            assert_eq!(balance(&f.store, acc), 1_000);
            assert_eq!(tx_count(&f.store, acc), 10);
        }
    }
}
