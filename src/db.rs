// 🗄️ Account/Transaction Store - SQLite + WAL
//
// Owns every persisted row. Free functions take a `&Connection` so they run
// unchanged inside an atomic unit (a `rusqlite::Transaction` derefs to one).

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::entities::{Account, Token, Transaction};
use crate::error::{Result, WalletError};

// ============================================================================
// STORE HANDLE
// ============================================================================

/// Handle to the wallet database shared by all requests.
///
/// Cheap to clone. Each unit of work opens its own connection and releases it
/// when done, so no request holds database resources beyond its own call.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Open (creating if needed) the database at `path` and ensure the schema
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let store = Store {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
        };

        let conn = store.connection()?;
        setup_database(&conn)?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh connection with busy waiting and foreign keys enabled
    pub fn connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Run `f` as one all-or-nothing unit.
    ///
    /// The unit starts with `BEGIN IMMEDIATE`, so it holds the write lock from
    /// its first read: two units can never both read the same stale balance.
    /// Any error returned by `f` (or by the commit) rolls everything back.
    pub fn atomic<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let value = f(&tx)?;
        tx.commit()?;

        Ok(value)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery and non-blocking readers
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
            identified INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            acc_id INTEGER NOT NULL REFERENCES accounts(id),
            amount INTEGER NOT NULL,
            created TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tokens (
            token TEXT PRIMARY KEY,
            acc_id INTEGER NOT NULL REFERENCES accounts(id),
            expires TEXT NOT NULL,
            created TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_acc_created
            ON transactions(acc_id, created);

        CREATE INDEX IF NOT EXISTS idx_tokens_acc ON tokens(acc_id);",
    )?;

    Ok(())
}

// ============================================================================
// TIME ENCODING
// ============================================================================

/// Fixed-width RFC 3339 in UTC, so text order equals time order
pub fn to_db_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `dt` cut to the microsecond precision the store keeps
pub fn stored_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(6)
}

fn time_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// `[first instant of now's month, first instant of the next month)`
fn month_bounds(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (next_year, next_month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    let start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0));
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0));

    match (start, end) {
        (Some(start), Some(end)) => Ok((start.and_utc(), end.and_utc())),
        _ => Err(WalletError::Internal(format!("cannot compute month bounds for {}", now))),
    }
}

// ============================================================================
// ACCOUNTS
// ============================================================================

const ACCOUNT_COLUMNS: &str = "id, balance, identified, name, phone, active, created";

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        balance: row.get(1)?,
        identified: row.get(2)?,
        username: row.get(3)?,
        phone: row.get(4)?,
        active: row.get(5)?,
        created: time_column(row, 6)?,
    })
}

/// Account by id, `NotFound` if missing
pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
        params![id],
        account_from_row,
    )
    .optional()?
    .ok_or(WalletError::NotFound)
}

pub fn get_account_by_phone(conn: &Connection, phone: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {} FROM accounts WHERE phone = ?1", ACCOUNT_COLUMNS),
            params![phone],
            account_from_row,
        )
        .optional()?;

    Ok(account)
}

/// Account together with its stored password hash (login only)
pub fn get_credentials_by_phone(conn: &Connection, phone: &str) -> Result<Option<(Account, String)>> {
    let found = conn
        .query_row(
            &format!("SELECT {}, password FROM accounts WHERE phone = ?1", ACCOUNT_COLUMNS),
            params![phone],
            |row| Ok((account_from_row(row)?, row.get::<_, String>(7)?)),
        )
        .optional()?;

    Ok(found)
}

/// Insert a fresh account (balance 0, unidentified, active).
/// A taken phone number surfaces as `AlreadyExists`.
pub fn insert_account(
    conn: &Connection,
    username: &str,
    phone: &str,
    password_hash: &str,
    created: DateTime<Utc>,
) -> Result<Account> {
    let result = conn.execute(
        "INSERT INTO accounts (name, phone, password, created) VALUES (?1, ?2, ?3, ?4)",
        params![username, phone, password_hash, to_db_time(created)],
    );

    match result {
        Ok(_) => get_account(conn, conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(WalletError::AlreadyExists)
        }
        Err(e) => Err(e.into()),
    }
}

/// Add `delta` to the stored balance
pub fn update_balance(conn: &Connection, acc_id: i64, delta: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts SET balance = balance + ?1 WHERE id = ?2",
        params![delta, acc_id],
    )?;

    if changed == 0 {
        return Err(WalletError::NotFound);
    }
    Ok(())
}

/// Raise the identified flag; repeating it is a no-op
pub fn set_identified(conn: &Connection, acc_id: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts SET identified = 1 WHERE id = ?1",
        params![acc_id],
    )?;

    if changed == 0 {
        return Err(WalletError::NotFound);
    }
    Ok(())
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// Insert a transaction row, returning its assigned id and timestamp
/// exactly as stored
pub fn insert_transaction(
    conn: &Connection,
    acc_id: i64,
    amount: i64,
    created: DateTime<Utc>,
) -> Result<(i64, DateTime<Utc>)> {
    let created = stored_precision(created);
    conn.execute(
        "INSERT INTO transactions (acc_id, amount, created) VALUES (?1, ?2, ?3)",
        params![acc_id, amount, to_db_time(created)],
    )?;

    Ok((conn.last_insert_rowid(), created))
}

/// Transactions of `acc_id` created in the calendar month (UTC) containing `now`
pub fn list_transactions_in_month(
    conn: &Connection,
    acc_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    let (start, end) = month_bounds(now)?;

    let mut stmt = conn.prepare(
        "SELECT id, acc_id, amount, created
         FROM transactions
         WHERE acc_id = ?1 AND created >= ?2 AND created < ?3
         ORDER BY created, id",
    )?;

    let transactions = stmt
        .query_map(params![acc_id, to_db_time(start), to_db_time(end)], |row| {
            Ok(Transaction {
                id: row.get(0)?,
                acc_id: row.get(1)?,
                amount: row.get(2)?,
                created: time_column(row, 3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(transactions)
}

pub fn count_transactions(conn: &Connection, acc_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE acc_id = ?1",
        params![acc_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Sum of every transaction ever applied to `acc_id`
pub fn sum_transactions(conn: &Connection, acc_id: i64) -> Result<i64> {
    let sum = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE acc_id = ?1",
        params![acc_id],
        |row| row.get(0),
    )?;

    Ok(sum)
}

// ============================================================================
// TOKENS
// ============================================================================

pub fn insert_token(conn: &Connection, token: &Token) -> Result<()> {
    conn.execute(
        "INSERT INTO tokens (token, acc_id, expires, created) VALUES (?1, ?2, ?3, ?4)",
        params![
            token.token,
            token.acc_id,
            to_db_time(token.expires),
            to_db_time(token.created),
        ],
    )?;

    Ok(())
}

pub fn get_token(conn: &Connection, token: &str) -> Result<Option<Token>> {
    let found = conn
        .query_row(
            "SELECT token, acc_id, expires, created FROM tokens WHERE token = ?1",
            params![token],
            |row| {
                Ok(Token {
                    token: row.get(0)?,
                    acc_id: row.get(1)?,
                    expires: time_column(row, 2)?,
                    created: time_column(row, 3)?,
                })
            },
        )
        .optional()?;

    Ok(found)
}

// ============================================================================
// TESTS
// ============================================================================
