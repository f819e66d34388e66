// 👛 Wallet Service - account operations around the transaction processor
//
// Registration, login tokens, identification and reads. Balance changes are
// delegated to `TransactionProcessor`; nothing here mutates a balance.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::auth;
use crate::context::RequestContext;
use crate::db::{self, Store};
use crate::entities::{
    Account, LimitTiers, MonthlyReport, RegInfo, Token, TokenInfo, Transaction, TransactionRequest,
};
use crate::error::{Result, WalletError};
use crate::processor::TransactionProcessor;

#[derive(Debug, Clone)]
pub struct WalletService {
    store: Store,
    processor: TransactionProcessor,
    token_ttl: chrono::Duration,
}

impl WalletService {
    pub fn new(store: Store, limits: LimitTiers, token_ttl: Duration) -> Result<Self> {
        let token_ttl = chrono::Duration::from_std(token_ttl)
            .map_err(|e| WalletError::Internal(format!("token ttl out of range: {}", e)))?;

        Ok(WalletService {
            processor: TransactionProcessor::new(store.clone(), limits),
            store,
            token_ttl,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ========================================================================
    // REGISTRATION + LOGIN
    // ========================================================================

    /// Account registered under `phone`, if any
    pub fn exists(&self, ctx: &RequestContext, phone: &str) -> Result<Option<Account>> {
        let _span = ctx.span().enter();
        let conn = self.store.connection()?;
        db::get_account_by_phone(&conn, phone)
    }

    pub fn register(&self, ctx: &RequestContext, info: RegInfo) -> Result<Account> {
        let _span = ctx.span().enter();
        info.validate()?;

        let conn = self.store.connection()?;
        if db::get_account_by_phone(&conn, &info.phone)?.is_some() {
            tracing::info!(phone = %info.phone, "registration rejected: phone taken");
            return Err(WalletError::AlreadyExists);
        }

        let hash = auth::hash_password(&info.password)?;
        let account = db::insert_account(&conn, &info.username, &info.phone, &hash, Utc::now())?;

        tracing::info!(acc_id = account.id, "account registered");
        Ok(account)
    }

    /// Exchange login (phone) + password for a bearer token
    pub fn issue_token(&self, ctx: &RequestContext, info: TokenInfo) -> Result<Token> {
        let _span = ctx.span().enter();
        let conn = self.store.connection()?;

        let (account, hash) =
            db::get_credentials_by_phone(&conn, &info.login)?.ok_or(WalletError::NotFound)?;
        auth::verify_password(&info.password, &hash)?;
        if !account.active {
            return Err(WalletError::Unauthorized);
        }

        let now = db::stored_precision(Utc::now());
        let token = Token {
            token: auth::generate_token(),
            acc_id: account.id,
            expires: now + self.token_ttl,
            created: now,
        };
        db::insert_token(&conn, &token)?;

        tracing::info!(acc_id = account.id, expires = %token.expires, "token issued");
        Ok(token)
    }

    /// Account id owning `token` at `now`
    pub fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<i64> {
        let conn = self.store.connection()?;
        let found = db::get_token(&conn, token)?.ok_or(WalletError::Unauthorized)?;

        if found.is_expired_at(now) {
            return Err(WalletError::TokenExpired);
        }
        Ok(found.acc_id)
    }

    // ========================================================================
    // ACCOUNT READS + IDENTIFICATION
    // ========================================================================

    pub fn account(&self, ctx: &RequestContext, acc_id: i64) -> Result<Account> {
        let _span = ctx.span().enter();
        let conn = self.store.connection()?;
        db::get_account(&conn, acc_id)
    }

    pub fn balance(&self, ctx: &RequestContext, acc_id: i64) -> Result<i64> {
        self.account(ctx, acc_id).map(|account| account.balance)
    }

    /// Raise the identified flag, moving the account to the higher limit tier
    pub fn identify(&self, ctx: &RequestContext, acc_id: i64) -> Result<()> {
        let _span = ctx.span().enter();
        let conn = self.store.connection()?;
        db::set_identified(&conn, acc_id)?;

        tracing::info!(acc_id, "account identified");
        Ok(())
    }

    pub fn monthly_report(
        &self,
        ctx: &RequestContext,
        acc_id: i64,
        now: DateTime<Utc>,
    ) -> Result<MonthlyReport> {
        let _span = ctx.span().enter();
        let conn = self.store.connection()?;
        let transactions = db::list_transactions_in_month(&conn, acc_id, now)?;
        Ok(MonthlyReport::from_transactions(transactions))
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    /// Apply a transaction on behalf of the context's caller.
    /// Callers may only move money on their own account.
    pub fn transaction(&self, ctx: &RequestContext, request: TransactionRequest) -> Result<Transaction> {
        let caller = ctx.require_caller()?;
        if caller != request.acc_id {
            let _span = ctx.span().enter();
            tracing::warn!(caller, acc_id = request.acc_id, "transaction on foreign account refused");
            return Err(WalletError::Unauthorized);
        }

        self.processor.apply(ctx, request.acc_id, request.amount)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, WalletService) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("wallet.db"), Duration::from_secs(5)).unwrap();
        let service = WalletService::new(store, LimitTiers::default(), Duration::from_secs(3600)).unwrap();
        (dir, service)
    }

    fn reg(phone: &str) -> RegInfo {
        RegInfo {
            username: "alice".into(),
            phone: phone.into(),
            password: "secret-pass".into(),
        }
    }

    #[test]
    fn test_register_then_exists() {
        let (_dir, svc) = service();
        let ctx = RequestContext::background();

        assert_eq!(svc.exists(&ctx, "+100").unwrap(), None);
        let acc = svc.register(&ctx, reg("+100")).unwrap();

        assert_eq!(acc.balance, 0);
        assert!(!acc.identified);
        assert_eq!(svc.exists(&ctx, "+100").unwrap(), Some(acc));
    }

    #[test]
    fn test_register_duplicate_phone() {
        let (_dir, svc) = service();
        let ctx = RequestContext::background();

        svc.register(&ctx, reg("+100")).unwrap();
        assert!(matches!(svc.register(&ctx, reg("+100")), Err(WalletError::AlreadyExists)));
    }

    #[test]
    fn test_register_validates_fields() {
        let (_dir, svc) = service();
        let mut info = reg("+100");
        info.password.clear();

        let result = svc.register(&RequestContext::background(), info);
        assert!(matches!(result, Err(WalletError::BadRequest(_))));
    }

    #[test]
    fn test_token_login_flow() {
        let (_dir, svc) = service();
        let ctx = RequestContext::background();
        let acc = svc.register(&ctx, reg("+100")).unwrap();

        let token = svc
            .issue_token(&ctx, TokenInfo { login: "+100".into(), password: "secret-pass".into() })
            .unwrap();
        assert_eq!(token.acc_id, acc.id);
        assert_eq!(svc.authenticate(&token.token, Utc::now()).unwrap(), acc.id);

        let conn = svc.store().connection().unwrap();
        let stored = db::get_token(&conn, &token.token).unwrap().unwrap();
        assert_eq!(stored.created, token.created);
        assert_eq!(stored.expires, token.expires);

        let later = token.expires + chrono::Duration::seconds(1);
        assert!(matches!(svc.authenticate(&token.token, later), Err(WalletError::TokenExpired)));
        assert!(matches!(svc.authenticate("bogus", Utc::now()), Err(WalletError::Unauthorized)));
    }

    #[test]
    fn test_token_rejects_bad_credentials() {
        let (_dir, svc) = service();
        let ctx = RequestContext::background();
        svc.register(&ctx, reg("+100")).unwrap();

        let wrong = svc.issue_token(&ctx, TokenInfo { login: "+100".into(), password: "nope".into() });
        assert!(matches!(wrong, Err(WalletError::InvalidPassword)));

        let unknown = svc.issue_token(&ctx, TokenInfo { login: "+999".into(), password: "x".into() });
        assert!(matches!(unknown, Err(WalletError::NotFound)));
    }

    #[test]
    fn test_identify_raises_limit() {
        let (_dir, svc) = service();
        let acc = svc.register(&RequestContext::background(), reg("+100")).unwrap();
        let ctx = RequestContext::new(Some(acc.id));

        let big = TransactionRequest { acc_id: acc.id, amount: 2_000_000 };
        assert!(matches!(svc.transaction(&ctx, big), Err(WalletError::OutOfLimit { .. })));

        svc.identify(&ctx, acc.id).unwrap();
        svc.identify(&ctx, acc.id).unwrap();
        assert!(svc.account(&ctx, acc.id).unwrap().identified);

        svc.transaction(&ctx, big).unwrap();
        assert_eq!(svc.balance(&ctx, acc.id).unwrap(), 2_000_000);
    }

    #[test]
    fn test_transaction_requires_owner() {
        let (_dir, svc) = service();
        let ctx = RequestContext::background();
        let alice = svc.register(&ctx, reg("+100")).unwrap();
        let bob = svc.register(&ctx, reg("+200")).unwrap();

        let request = TransactionRequest { acc_id: alice.id, amount: 100 };

        let anonymous = svc.transaction(&RequestContext::background(), request);
        assert!(matches!(anonymous, Err(WalletError::Unauthorized)));

        let foreign = svc.transaction(&RequestContext::new(Some(bob.id)), request);
        assert!(matches!(foreign, Err(WalletError::Unauthorized)));
        assert_eq!(svc.balance(&ctx, alice.id).unwrap(), 0);
    }

    #[test]
    fn test_monthly_report_counts_current_month() {
        let (_dir, svc) = service();
        let acc = svc.register(&RequestContext::background(), reg("+100")).unwrap();
        let ctx = RequestContext::new(Some(acc.id));

        for amount in [500, -200, 0] {
            svc.transaction(&ctx, TransactionRequest { acc_id: acc.id, amount }).unwrap();
        }

        let report = svc.monthly_report(&ctx, acc.id, Utc::now()).unwrap();
        assert_eq!(report.count, 3);
        assert_eq!(report.sum, 300);
        assert_eq!(report.sum, svc.balance(&ctx, acc.id).unwrap());
    }
}
