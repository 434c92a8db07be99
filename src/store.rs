// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Typed record store over the local SQLite database.
//!
//! All money is stored as TEXT and summed in Rust. Timestamps are unix
//! milliseconds in UTC.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::db;
use crate::error::{Error, Result};
use crate::models::{Budget, MAX_AMOUNT, SyncState, Transaction, TransactionKind};

const TX_COLS: &str =
    "id, amount, kind, category, description, occurred_at, remote_id, sync_state, last_synced_at";
const BUDGET_COLS: &str = "id, category, amount, month, year, created_at, is_active, remote_id, sync_state, last_synced_at";

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Wraps a connection whose schema is already in place (see `db::open_at`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::with_schema(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> Result<Self> {
        db::init_schema(&conn)?;
        Ok(Self::new(conn))
    }

    /// Short-lived access to the raw connection. Never hold across an await.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---- transactions ----

    pub fn insert_transaction(&self, tx: &Transaction) -> Result<i64> {
        check_amount(tx.amount)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO transactions(amount, kind, category, description, occurred_at, remote_id, sync_state, last_synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tx.amount.to_string(),
                tx.kind.as_str(),
                tx.category,
                tx.description,
                to_millis(&tx.occurred_at),
                tx.remote_id,
                tx.sync_state.as_str(),
                tx.last_synced_at.as_ref().map(to_millis),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        check_amount(tx.amount)?;
        let n = self.conn().execute(
            "UPDATE transactions SET amount=?1, kind=?2, category=?3, description=?4, occurred_at=?5,
                 remote_id=?6, sync_state=?7, last_synced_at=?8
             WHERE id=?9",
            params![
                tx.amount.to_string(),
                tx.kind.as_str(),
                tx.category,
                tx.description,
                to_millis(&tx.occurred_at),
                tx.remote_id,
                tx.sync_state.as_str(),
                tx.last_synced_at.as_ref().map(to_millis),
                tx.id,
            ],
        )?;
        if n == 0 {
            return Err(Error::NotFound {
                entity: "transaction",
                id: tx.id,
            });
        }
        Ok(())
    }

    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let n = self
            .conn()
            .execute("DELETE FROM transactions WHERE id=?1", params![id])?;
        Ok(n > 0)
    }

    pub fn set_transaction_state(&self, id: i64, state: SyncState) -> Result<()> {
        self.conn().execute(
            "UPDATE transactions SET sync_state=?1 WHERE id=?2",
            params![state.as_str(), id],
        )?;
        Ok(())
    }

    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {TX_COLS} FROM transactions WHERE id=?1");
        Ok(self
            .conn()
            .query_row(&sql, params![id], transaction_from_row)
            .optional()?)
    }

    pub fn transaction_by_remote_id(&self, remote_id: &str) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {TX_COLS} FROM transactions WHERE remote_id=?1");
        Ok(self
            .conn()
            .query_row(&sql, params![remote_id], transaction_from_row)
            .optional()?)
    }

    /// Newest first.
    pub fn list_transactions(&self, limit: Option<usize>) -> Result<Vec<Transaction>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT {TX_COLS} FROM transactions ORDER BY occurred_at DESC, id DESC LIMIT ?1"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], transaction_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn transactions_by_sync_state(&self, states: &[SyncState]) -> Result<Vec<Transaction>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {TX_COLS} FROM transactions WHERE sync_state IN ({}) ORDER BY id",
            placeholders(states.len())
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(states.iter().map(|s| s.as_str())),
            transaction_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Both bounds inclusive.
    pub fn transactions_between(
        &self,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TX_COLS} FROM transactions WHERE occurred_at BETWEEN ?1 AND ?2
             ORDER BY occurred_at, id"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![to_millis(start), to_millis(end)], transaction_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Expense transactions of a calendar month, matched on the formatted
    /// date parts of `occurred_at`.
    pub fn expenses_for_month(
        &self,
        category: Option<&str>,
        month: u32,
        year: i32,
    ) -> Result<Vec<Transaction>> {
        let mm = format!("{:02}", month);
        let yyyy = format!("{:04}", year);
        let mut sql = format!(
            "SELECT {TX_COLS} FROM transactions
             WHERE kind='EXPENSE'
               AND strftime('%m', occurred_at / 1000.0, 'unixepoch') = ?1
               AND strftime('%Y', occurred_at / 1000.0, 'unixepoch') = ?2"
        );
        if category.is_some() {
            sql.push_str(" AND category = ?3");
        }
        sql.push_str(" ORDER BY occurred_at, id");
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = match category {
            Some(c) => stmt
                .query_map(params![mm, yyyy, c], transaction_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map(params![mm, yyyy], transaction_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
    }

    pub fn expense_total_for_month(&self, category: &str, month: u32, year: i32) -> Result<Decimal> {
        Ok(self
            .expenses_for_month(Some(category), month, year)?
            .iter()
            .map(|t| t.amount)
            .sum())
    }

    // ---- budgets ----

    pub fn insert_budget(&self, b: &Budget) -> Result<i64> {
        check_amount(b.amount)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO budgets(category, amount, month, year, created_at, is_active, remote_id, sync_state, last_synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                b.category,
                b.amount.to_string(),
                b.month,
                b.year,
                to_millis(&b.created_at),
                b.is_active,
                b.remote_id,
                b.sync_state.as_str(),
                b.last_synced_at.as_ref().map(to_millis),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_budget(&self, b: &Budget) -> Result<()> {
        check_amount(b.amount)?;
        let n = self.conn().execute(
            "UPDATE budgets SET category=?1, amount=?2, month=?3, year=?4, created_at=?5, is_active=?6,
                 remote_id=?7, sync_state=?8, last_synced_at=?9
             WHERE id=?10",
            params![
                b.category,
                b.amount.to_string(),
                b.month,
                b.year,
                to_millis(&b.created_at),
                b.is_active,
                b.remote_id,
                b.sync_state.as_str(),
                b.last_synced_at.as_ref().map(to_millis),
                b.id,
            ],
        )?;
        if n == 0 {
            return Err(Error::NotFound {
                entity: "budget",
                id: b.id,
            });
        }
        Ok(())
    }

    pub fn delete_budget(&self, id: i64) -> Result<bool> {
        let n = self
            .conn()
            .execute("DELETE FROM budgets WHERE id=?1", params![id])?;
        Ok(n > 0)
    }

    /// Hard-deletes every listed budget in one store transaction.
    pub fn delete_budgets(&self, ids: &[i64]) -> Result<usize> {
        let mut conn = self.conn();
        let dbtx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = dbtx.prepare("DELETE FROM budgets WHERE id=?1")?;
            for id in ids {
                deleted += stmt.execute(params![id])?;
            }
        }
        dbtx.commit()?;
        Ok(deleted)
    }

    pub fn deactivate_budget(&self, id: i64) -> Result<bool> {
        let n = self.conn().execute(
            "UPDATE budgets SET is_active=0 WHERE id=?1",
            params![id],
        )?;
        Ok(n > 0)
    }

    pub fn set_budget_state(&self, id: i64, state: SyncState) -> Result<()> {
        self.conn().execute(
            "UPDATE budgets SET sync_state=?1 WHERE id=?2",
            params![state.as_str(), id],
        )?;
        Ok(())
    }

    pub fn get_budget(&self, id: i64) -> Result<Option<Budget>> {
        let sql = format!("SELECT {BUDGET_COLS} FROM budgets WHERE id=?1");
        Ok(self
            .conn()
            .query_row(&sql, params![id], budget_from_row)
            .optional()?)
    }

    pub fn budget_by_remote_id(&self, remote_id: &str) -> Result<Option<Budget>> {
        let sql = format!("SELECT {BUDGET_COLS} FROM budgets WHERE remote_id=?1");
        Ok(self
            .conn()
            .query_row(&sql, params![remote_id], budget_from_row)
            .optional()?)
    }

    /// The active budget for a key. Among duplicates, the most recently
    /// synced wins, then the highest id (NULL sync times sort last under DESC).
    pub fn find_active_budget(&self, category: &str, month: u32, year: i32) -> Result<Option<Budget>> {
        let sql = format!(
            "SELECT {BUDGET_COLS} FROM budgets
             WHERE category=?1 AND month=?2 AND year=?3 AND is_active=1
             ORDER BY last_synced_at DESC, id DESC LIMIT 1"
        );
        Ok(self
            .conn()
            .query_row(&sql, params![category, month, year], budget_from_row)
            .optional()?)
    }

    pub fn list_budgets(&self, include_inactive: bool) -> Result<Vec<Budget>> {
        let filter = if include_inactive { "" } else { "WHERE is_active=1" };
        let sql = format!(
            "SELECT {BUDGET_COLS} FROM budgets {filter} ORDER BY year DESC, month DESC, category, id"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], budget_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// One active budget per category of the month, picked the same way as
    /// `find_active_budget`.
    pub fn active_budgets_for_month(&self, month: u32, year: i32) -> Result<Vec<Budget>> {
        let sql = format!(
            "SELECT {BUDGET_COLS} FROM (
                 SELECT *, ROW_NUMBER() OVER (
                     PARTITION BY category ORDER BY last_synced_at DESC, id DESC
                 ) AS pos
                 FROM budgets
                 WHERE month=?1 AND year=?2 AND is_active=1
             )
             WHERE pos=1
             ORDER BY category"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![month, year], budget_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn budgets_by_sync_state(&self, states: &[SyncState]) -> Result<Vec<Budget>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {BUDGET_COLS} FROM budgets WHERE sync_state IN ({}) ORDER BY id",
            placeholders(states.len())
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(states.iter().map(|s| s.as_str())),
            budget_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn check_amount(amount: Decimal) -> Result<()> {
    if amount.abs() > MAX_AMOUNT {
        return Err(Error::Invalid(format!("amount {amount} exceeds {MAX_AMOUNT}")));
    }
    Ok(())
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(",")
}

pub(crate) fn to_millis(t: &DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

fn conversion_error<E>(idx: usize, ty: Type, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    s.parse::<Decimal>()
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    from_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn opt_time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let ms: Option<i64> = row.get(idx)?;
    ms.map(|ms| from_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms)))
        .transpose()
}

fn sync_state_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<SyncState> {
    let s: String = row.get(idx)?;
    s.parse::<SyncState>()
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let kind: String = row.get(2)?;
    Ok(Transaction {
        id: row.get(0)?,
        amount: decimal_at(row, 1)?,
        kind: kind
            .parse::<TransactionKind>()
            .map_err(|e| conversion_error(2, Type::Text, e))?,
        category: row.get(3)?,
        description: row.get(4)?,
        occurred_at: time_at(row, 5)?,
        remote_id: row.get(6)?,
        sync_state: sync_state_at(row, 7)?,
        last_synced_at: opt_time_at(row, 8)?,
    })
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        category: row.get(1)?,
        amount: decimal_at(row, 2)?,
        month: row.get(3)?,
        year: row.get(4)?,
        created_at: time_at(row, 5)?,
        is_active: row.get(6)?,
        remote_id: row.get(7)?,
        sync_state: sync_state_at(row, 8)?,
        last_synced_at: opt_time_at(row, 9)?,
    })
}

/// Store operations the reconciler needs, uniform over both record kinds.
pub trait LocalRecord: Sized {
    fn set_local_id(&mut self, id: i64);
    fn set_sync_state(&mut self, state: SyncState);
    fn insert_into(&self, store: &Store) -> Result<i64>;
    fn update_in(&self, store: &Store) -> Result<()>;
    fn delete_from(store: &Store, id: i64) -> Result<bool>;
    fn mark_state(store: &Store, id: i64, state: SyncState) -> Result<()>;
    fn by_remote_id(store: &Store, remote_id: &str) -> Result<Option<Self>>;
    fn by_sync_state(store: &Store, states: &[SyncState]) -> Result<Vec<Self>>;

    /// A local record to merge an incoming remote row into when no record
    /// carries its remote id yet.
    fn fallback_match(&self, _store: &Store) -> Result<Option<Self>> {
        Ok(None)
    }
}

impl LocalRecord for Transaction {
    fn set_local_id(&mut self, id: i64) {
        self.id = id;
    }

    fn set_sync_state(&mut self, state: SyncState) {
        self.sync_state = state;
    }

    fn insert_into(&self, store: &Store) -> Result<i64> {
        store.insert_transaction(self)
    }

    fn update_in(&self, store: &Store) -> Result<()> {
        store.update_transaction(self)
    }

    fn delete_from(store: &Store, id: i64) -> Result<bool> {
        store.delete_transaction(id)
    }

    fn mark_state(store: &Store, id: i64, state: SyncState) -> Result<()> {
        store.set_transaction_state(id, state)
    }

    fn by_remote_id(store: &Store, remote_id: &str) -> Result<Option<Self>> {
        store.transaction_by_remote_id(remote_id)
    }

    fn by_sync_state(store: &Store, states: &[SyncState]) -> Result<Vec<Self>> {
        store.transactions_by_sync_state(states)
    }
}

impl LocalRecord for Budget {
    fn set_local_id(&mut self, id: i64) {
        self.id = id;
    }

    fn set_sync_state(&mut self, state: SyncState) {
        self.sync_state = state;
    }

    fn insert_into(&self, store: &Store) -> Result<i64> {
        store.insert_budget(self)
    }

    fn update_in(&self, store: &Store) -> Result<()> {
        store.update_budget(self)
    }

    fn delete_from(store: &Store, id: i64) -> Result<bool> {
        store.delete_budget(id)
    }

    fn mark_state(store: &Store, id: i64, state: SyncState) -> Result<()> {
        store.set_budget_state(id, state)
    }

    fn by_remote_id(store: &Store, remote_id: &str) -> Result<Option<Self>> {
        store.budget_by_remote_id(remote_id)
    }

    fn by_sync_state(store: &Store, states: &[SyncState]) -> Result<Vec<Self>> {
        store.budgets_by_sync_state(states)
    }

    /// Same category and period, so a budget created here and synced
    /// separately does not become a duplicate.
    fn fallback_match(&self, store: &Store) -> Result<Option<Self>> {
        store.find_active_budget(&self.category, self.month, self.year)
    }
}
