// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Reconciliation between the local store and the remote backend.
//!
//! Local writes always land in the store first. Remote calls are best effort
//! and their outcome is recorded in each record's sync state. Composite syncs
//! are serialized: a second one started while another runs fails with
//! [`Error::SyncInProgress`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, warn};

use crate::budgets::BudgetEngine;
use crate::error::{Error, Result};
use crate::models::{Budget, SyncState, Transaction};
use crate::remote::records::remote_id_of;
use crate::remote::{RemoteClient, SyncRecord};
use crate::settings;
use crate::store::{LocalRecord, Store};

/// Page size of every remote listing.
pub const PAGE_SIZE: usize = 100;

const RETRYABLE: [SyncState; 2] = [SyncState::SyncFailed, SyncState::SyncPending];

/// Observable reconciler state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    pub status: String,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub is_connected: bool,
    pub last_connection_error: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub sync_enabled: bool,
}

/// Outcome of a composite sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Transactions ingested, or listed remotely for a clean sync.
    pub transactions: usize,
    pub budgets: usize,
    /// Local records removed because the remote no longer lists them.
    pub deleted: usize,
    /// Retry outcomes.
    pub succeeded: usize,
    pub failed: usize,
    pub message: String,
}

/// Parsed remote rows. Rows that fail to parse are kept aside so that one
/// bad record does not sink the whole listing.
#[derive(Debug, Clone)]
pub struct Batch<R> {
    pub records: Vec<R>,
    pub rejected: Vec<String>,
    /// Every readable remote id, rejected rows included.
    pub remote_ids: HashSet<String>,
}

impl<R> Default for Batch<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
            remote_ids: HashSet::new(),
        }
    }
}

impl<R: SyncRecord> Batch<R> {
    pub fn parse(rows: Vec<Value>) -> Self {
        let mut batch = Self::default();
        for row in rows {
            if let Some(id) = remote_id_of(&row, R::TABLE) {
                batch.remote_ids.insert(id);
            }
            match R::from_remote(&row) {
                Ok(r) => batch.records.push(r),
                Err(e) => batch.rejected.push(e.to_string()),
            }
        }
        batch
    }

    /// Rows received, parsed or not.
    pub fn len(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn extend(&mut self, other: Batch<R>) {
        self.records.extend(other.records);
        self.rejected.extend(other.rejected);
        self.remote_ids.extend(other.remote_ids);
    }
}

pub struct Reconciler {
    store: Arc<Store>,
    remote: Arc<dyn RemoteClient>,
    state: watch::Sender<SyncSnapshot>,
    running: Mutex<()>,
}

impl Reconciler {
    pub fn new(store: Arc<Store>, remote: Arc<dyn RemoteClient>) -> Result<Self> {
        let enabled = settings::sync_enabled(&store.conn())?;
        let (state, _) = watch::channel(SyncSnapshot {
            sync_enabled: enabled,
            ..SyncSnapshot::default()
        });
        Ok(Self {
            store,
            remote,
            state,
            running: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.state.borrow().clone()
    }

    pub fn sync_enabled(&self) -> bool {
        self.state.borrow().sync_enabled
    }

    fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        debug!(%status, "sync status");
        self.state.send_modify(|s| s.status = status);
    }

    fn note_error(&self, e: &Error) {
        let msg = e.to_string();
        self.state.send_modify(|s| s.last_error = Some(msg));
    }

    // ---- toggle and connection ----

    pub fn enable_sync(&self) -> Result<()> {
        self.set_enabled(true)
    }

    pub fn disable_sync(&self) -> Result<()> {
        self.set_enabled(false)
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        settings::set_sync_enabled(&self.store.conn(), enabled)?;
        let status = if enabled {
            "Remote sync enabled"
        } else {
            "Remote sync disabled"
        };
        info!(enabled, "sync toggled");
        self.state.send_modify(|s| {
            s.sync_enabled = enabled;
            s.status = status.to_string();
        });
        Ok(())
    }

    pub fn clear_errors(&self) {
        self.state.send_modify(|s| {
            s.last_error = None;
            s.last_connection_error = None;
        });
    }

    pub async fn test_connection(&self) -> bool {
        self.set_status("Testing connection...");
        let outcome = self.remote.health().await;
        let connected = outcome.is_ok();
        match &outcome {
            Ok(()) => info!("remote reachable"),
            Err(e) => warn!(error = %e, "remote unreachable"),
        }
        self.state.send_modify(|s| {
            s.is_connected = connected;
            s.last_connection_error = outcome.err().map(|e| e.to_string());
            s.status = if connected {
                "Connection successful".into()
            } else {
                "Connection failed".into()
            };
        });
        connected
    }

    // ---- primitives ----

    /// Creates the record remotely and returns it with its remote id and a
    /// synced state. Local storage is left alone.
    pub async fn create_remote<R: SyncRecord>(&self, rec: &R) -> Result<R> {
        let remote_id = self.remote.create(R::TABLE, rec.to_payload()).await?;
        debug!(entity = R::ENTITY, local_id = rec.local_id(), %remote_id, "created remotely");
        let mut synced = rec.clone();
        synced.mark_synced(remote_id, Utc::now());
        Ok(synced)
    }

    pub async fn update_remote<R: SyncRecord>(&self, rec: &R) -> Result<R> {
        let remote_id = rec
            .remote_id()
            .ok_or_else(|| Error::MissingRemoteId(format!("{} {}", R::ENTITY, rec.local_id())))?
            .to_string();
        self.remote
            .update(R::TABLE, &remote_id, rec.to_payload())
            .await?;
        debug!(entity = R::ENTITY, %remote_id, "updated remotely");
        let mut synced = rec.clone();
        synced.mark_synced(remote_id, Utc::now());
        Ok(synced)
    }

    pub async fn delete_remote<R: SyncRecord>(&self, rec: &R) -> Result<bool> {
        let remote_id = rec
            .remote_id()
            .ok_or_else(|| Error::MissingRemoteId(format!("{} {}", R::ENTITY, rec.local_id())))?;
        self.remote.delete(R::TABLE, remote_id).await?;
        debug!(entity = R::ENTITY, %remote_id, "deleted remotely");
        Ok(true)
    }

    /// One page of remote records, newest first.
    pub async fn fetch_page<R: SyncRecord>(&self, offset: usize, limit: usize) -> Result<Batch<R>> {
        let rows = self.remote.list(R::TABLE, offset, limit).await?;
        let batch = Batch::<R>::parse(rows);
        for reason in &batch.rejected {
            warn!(table = R::TABLE.as_str(), offset, %reason, "skipping malformed remote record");
        }
        Ok(batch)
    }

    /// Every remote record, page by page until a short page. The first
    /// failed page aborts the whole fetch.
    pub async fn fetch_all<R: SyncRecord>(&self) -> Result<Batch<R>> {
        let mut all = Batch::default();
        let mut offset = 0;
        loop {
            self.set_status(format!(
                "Fetching {} batch {}...",
                R::TABLE,
                offset / PAGE_SIZE + 1
            ));
            let page = self.fetch_page::<R>(offset, PAGE_SIZE).await?;
            let n = page.len();
            debug!(table = R::TABLE.as_str(), offset, rows = n, "fetched page");
            all.extend(page);
            if n < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }
        info!(table = R::TABLE.as_str(), total = all.len(), "fetched all remote records");
        Ok(all)
    }

    // ---- ingestion ----

    /// Inserts or updates one remote record locally. Matches by remote id,
    /// then by the record's fallback key. The stored record is synced.
    pub fn upsert<R: SyncRecord + LocalRecord>(&self, mut rec: R) -> Result<R> {
        let existing = match rec.remote_id() {
            Some(rid) => R::by_remote_id(&self.store, rid)?,
            None => None,
        };
        let existing = match existing {
            Some(e) => Some(e),
            None => rec.fallback_match(&self.store)?,
        };
        match existing {
            Some(local) => {
                rec.set_local_id(local.local_id());
                rec.update_in(&self.store)?;
            }
            None => {
                let id = rec.insert_into(&self.store)?;
                rec.set_local_id(id);
            }
        }
        Ok(rec)
    }

    /// Upserts every record, continuing past failures. Returns how many
    /// were stored.
    fn ingest<R: SyncRecord + LocalRecord>(&self, records: Vec<R>) -> usize {
        let mut stored = 0;
        for rec in records {
            let remote_id = rec.remote_id().unwrap_or_default().to_string();
            match self.upsert(rec) {
                Ok(_) => stored += 1,
                Err(e) => warn!(entity = R::ENTITY, %remote_id, error = %e, "failed to ingest remote record"),
            }
        }
        stored
    }

    fn ingest_budgets(&self, records: Vec<Budget>) -> usize {
        let n = self.ingest(records);
        BudgetEngine::new(&self.store).cleanup_duplicate_budgets();
        n
    }

    // ---- composite syncs ----

    fn begin(&self, status: &str) -> Result<MutexGuard<'_, ()>> {
        let guard = self.running.try_lock().map_err(|_| Error::SyncInProgress)?;
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.last_error = None;
            s.status = status.to_string();
        });
        info!(%status, "sync started");
        Ok(guard)
    }

    fn finish(&self, outcome: &Result<SyncReport>, failure: &str) {
        self.state.send_modify(|s| {
            s.is_loading = false;
            match outcome {
                Ok(r) => {
                    s.status = r.message.clone();
                    s.last_sync_at = Some(Utc::now());
                }
                Err(e) => {
                    s.status = format!("{failure}: {e}");
                    s.last_error = Some(e.to_string());
                }
            }
        });
        match outcome {
            Ok(r) => info!(message = %r.message, "sync finished"),
            Err(e) => warn!(error = %e, "{failure}"),
        }
    }

    fn disabled_report(&self) -> SyncReport {
        let message = "Remote sync is disabled".to_string();
        self.set_status(message.clone());
        SyncReport {
            message,
            ..SyncReport::default()
        }
    }

    /// Fetches and ingests every remote record. Deletes nothing.
    pub async fn full_sync(&self) -> Result<SyncReport> {
        if !self.sync_enabled() {
            return Ok(self.disabled_report());
        }
        let _running = self.begin("Starting full incremental sync...")?;
        let outcome = self.full_inner().await;
        self.finish(&outcome, "Full sync failed");
        outcome
    }

    async fn full_inner(&self) -> Result<SyncReport> {
        let txs = self.fetch_all::<Transaction>().await?;
        let budgets = self.fetch_all::<Budget>().await?;
        self.set_status("Finalizing sync...");
        let transactions = self.ingest(txs.records);
        let budgets = self.ingest_budgets(budgets.records);
        Ok(SyncReport {
            transactions,
            budgets,
            message: format!(
                "Full sync completed successfully ({transactions} transactions, {budgets} budgets)"
            ),
            ..SyncReport::default()
        })
    }

    /// Ingests the first page of each record kind.
    pub async fn incremental_sync(&self) -> Result<SyncReport> {
        if !self.sync_enabled() {
            return Ok(self.disabled_report());
        }
        let _running = self.begin("Starting incremental sync...")?;
        let outcome = self.incremental_inner().await;
        self.finish(&outcome, "Incremental sync failed");
        outcome
    }

    /// Both kinds are attempted even when the first fails; the first
    /// failure is returned after the other kind has been ingested.
    async fn incremental_inner(&self) -> Result<SyncReport> {
        self.set_status("Fetching recent transactions...");
        let txs = self.fetch_page::<Transaction>(0, PAGE_SIZE).await;
        let transactions = match txs {
            Ok(batch) => Ok(self.ingest(batch.records)),
            Err(e) => Err(e),
        };

        self.set_status("Fetching recent budgets...");
        let budgets = match self.fetch_page::<Budget>(0, PAGE_SIZE).await {
            Ok(batch) => Ok(self.ingest_budgets(batch.records)),
            Err(e) => Err(e),
        };

        let transactions = transactions?;
        let budgets = budgets?;
        Ok(SyncReport {
            transactions,
            budgets,
            message: format!(
                "Incremental sync completed ({transactions} transactions, {budgets} budgets)"
            ),
            ..SyncReport::default()
        })
    }

    /// Removes local synced records whose remote counterpart is gone.
    /// Records without a remote id are never touched.
    pub async fn clean_sync(&self) -> Result<SyncReport> {
        if !self.sync_enabled() {
            return Ok(self.disabled_report());
        }
        let _running = self.begin("Starting clean sync...")?;
        let outcome = self.clean_inner().await;
        self.finish(&outcome, "Clean sync failed");
        outcome
    }

    async fn clean_inner(&self) -> Result<SyncReport> {
        self.set_status("Fetching all remote data...");
        let txs = self.fetch_all::<Transaction>().await?;
        let budgets = self.fetch_all::<Budget>().await?;

        self.set_status("Identifying deleted records...");
        let stale_txs = self.stale::<Transaction>(&txs.remote_ids)?;
        let stale_budgets = self.stale::<Budget>(&budgets.remote_ids)?;

        self.set_status("Removing deleted records...");
        let mut deleted = 0;
        deleted += self.remove_stale::<Transaction>(&stale_txs)?;
        deleted += self.remove_stale::<Budget>(&stale_budgets)?;

        Ok(SyncReport {
            transactions: txs.len(),
            budgets: budgets.len(),
            deleted,
            message: format!(
                "Clean sync completed ({} transactions, {} budgets, {deleted} deleted)",
                txs.len(),
                budgets.len()
            ),
            ..SyncReport::default()
        })
    }

    fn stale<R: SyncRecord + LocalRecord>(&self, remote_ids: &HashSet<String>) -> Result<Vec<R>> {
        Ok(R::by_sync_state(&self.store, &[SyncState::Synced])?
            .into_iter()
            .filter(|r| r.remote_id().is_some_and(|rid| !remote_ids.contains(rid)))
            .collect())
    }

    fn remove_stale<R: SyncRecord + LocalRecord>(&self, stale: &[R]) -> Result<usize> {
        let mut n = 0;
        for r in stale {
            if R::delete_from(&self.store, r.local_id())? {
                debug!(entity = R::ENTITY, remote_id = r.remote_id().unwrap_or_default(), "removed remotely deleted record");
                n += 1;
            }
        }
        Ok(n)
    }

    /// Pushes every failed or pending record again. One record failing does
    /// not stop the others.
    pub async fn retry_failed_sync(&self) -> Result<SyncReport> {
        if !self.sync_enabled() {
            return Ok(self.disabled_report());
        }
        let _running = self.begin("Retrying failed sync records...")?;
        let outcome = self.retry_inner().await;
        self.finish(&outcome, "Retry sync failed");
        outcome
    }

    async fn retry_inner(&self) -> Result<SyncReport> {
        let txs = Transaction::by_sync_state(&self.store, &RETRYABLE)?;
        let budgets = Budget::by_sync_state(&self.store, &RETRYABLE)?;
        if txs.is_empty() && budgets.is_empty() {
            return Ok(SyncReport {
                message: "No failed records to retry".into(),
                ..SyncReport::default()
            });
        }

        let mut report = SyncReport::default();
        self.set_status("Retrying transactions...");
        for tx in txs {
            self.retry_one(tx, &mut report).await;
        }
        self.set_status("Retrying budgets...");
        for b in budgets {
            self.retry_one(b, &mut report).await;
        }
        report.message = format!(
            "Retry completed: {} successful, {} failed",
            report.succeeded, report.failed
        );
        Ok(report)
    }

    async fn retry_one<R: SyncRecord + LocalRecord>(&self, rec: R, report: &mut SyncReport) {
        match self.push(rec).await {
            Ok(stored) if stored.sync_state() == SyncState::Synced => report.succeeded += 1,
            Ok(_) => report.failed += 1,
            Err(e) => {
                warn!(entity = R::ENTITY, error = %e, "retry could not update local record");
                report.failed += 1;
            }
        }
    }

    /// Incremental sync followed by a retry pass. Runs both regardless of
    /// how the first went.
    pub async fn smart_sync(&self) -> Result<SyncReport> {
        if !self.sync_enabled() {
            return Ok(self.disabled_report());
        }
        let _running = self.begin("Starting smart sync...")?;
        let incremental = self.incremental_inner().await;
        let retry = self.retry_inner().await;

        let mut report = SyncReport::default();
        let inc_msg = match &incremental {
            Ok(r) => {
                report.transactions = r.transactions;
                report.budgets = r.budgets;
                r.message.clone()
            }
            Err(e) => format!("Incremental sync failed: {e}"),
        };
        let retry_msg = match &retry {
            Ok(r) => {
                report.succeeded = r.succeeded;
                report.failed = r.failed;
                r.message.clone()
            }
            Err(e) => format!("Retry sync failed: {e}"),
        };
        report.message = format!("Smart sync completed - {inc_msg} | {retry_msg}");

        let outcome = Ok(report);
        self.finish(&outcome, "Smart sync failed");
        if let Some(e) = incremental.err().or(retry.err()) {
            self.note_error(&e);
        }
        outcome
    }

    // ---- local-first writes ----

    /// Pushes a stored record (create without a remote id, update with one)
    /// and records the outcome locally. Remote failures leave the record
    /// SYNC_FAILED; only store failures are returned.
    async fn push<R: SyncRecord + LocalRecord>(&self, rec: R) -> Result<R> {
        let outcome = match rec.remote_id() {
            None => self.create_remote(&rec).await,
            Some(_) => self.update_remote(&rec).await,
        };
        match outcome {
            Ok(synced) => {
                synced.update_in(&self.store)?;
                Ok(synced)
            }
            Err(e) => {
                warn!(entity = R::ENTITY, local_id = rec.local_id(), error = %e, "remote write failed");
                self.note_error(&e);
                R::mark_state(&self.store, rec.local_id(), SyncState::SyncFailed)?;
                let mut failed = rec;
                failed.set_sync_state(SyncState::SyncFailed);
                Ok(failed)
            }
        }
    }

    async fn record<R: SyncRecord + LocalRecord>(&self, mut rec: R) -> Result<R> {
        let enabled = self.sync_enabled();
        rec.set_sync_state(if enabled {
            SyncState::SyncPending
        } else {
            SyncState::Local
        });
        let id = rec.insert_into(&self.store)?;
        rec.set_local_id(id);
        if !enabled {
            return Ok(rec);
        }
        self.push(rec).await
    }

    async fn edit<R: SyncRecord + LocalRecord>(&self, mut rec: R) -> Result<R> {
        let enabled = self.sync_enabled();
        let pushable = enabled && rec.remote_id().is_some();
        // offline edits of synced records wait for the next retry pass
        if enabled || rec.remote_id().is_some() {
            rec.set_sync_state(SyncState::SyncPending);
        }
        rec.update_in(&self.store)?;
        if !pushable {
            return Ok(rec);
        }
        self.push(rec).await
    }

    async fn remove<R: SyncRecord + LocalRecord>(&self, rec: &R) -> Result<bool> {
        let removed = R::delete_from(&self.store, rec.local_id())?;
        if removed && self.sync_enabled() && rec.remote_id().is_some() {
            if let Err(e) = self.delete_remote(rec).await {
                warn!(entity = R::ENTITY, remote_id = rec.remote_id().unwrap_or_default(), error = %e, "remote delete failed");
                self.note_error(&e);
            }
        }
        Ok(removed)
    }

    pub async fn record_transaction(&self, tx: Transaction) -> Result<Transaction> {
        validate_transaction(&tx)?;
        self.record(tx).await
    }

    pub async fn edit_transaction(&self, tx: Transaction) -> Result<Transaction> {
        validate_transaction(&tx)?;
        self.edit(tx).await
    }

    pub async fn remove_transaction(&self, id: i64) -> Result<bool> {
        match self.store.get_transaction(id)? {
            Some(tx) => self.remove(&tx).await,
            None => Ok(false),
        }
    }

    pub async fn record_budget(&self, budget: Budget) -> Result<Budget> {
        validate_budget(&budget)?;
        self.record(budget).await
    }

    pub async fn edit_budget(&self, budget: Budget) -> Result<Budget> {
        validate_budget(&budget)?;
        self.edit(budget).await
    }

    pub async fn remove_budget(&self, id: i64) -> Result<bool> {
        match self.store.get_budget(id)? {
            Some(b) => self.remove(&b).await,
            None => Ok(false),
        }
    }

    /// Soft-deletes a budget and pushes the change.
    pub async fn retire_budget(&self, id: i64) -> Result<Budget> {
        let mut b = self
            .store
            .get_budget(id)?
            .ok_or(Error::NotFound { entity: "budget", id })?;
        b.is_active = false;
        self.edit(b).await
    }
}

fn validate_transaction(tx: &Transaction) -> Result<()> {
    if tx.amount <= rust_decimal::Decimal::ZERO {
        return Err(Error::Invalid(format!(
            "transaction amount {} must be positive",
            tx.amount
        )));
    }
    if tx.category.trim().is_empty() {
        return Err(Error::Invalid("transaction category is empty".into()));
    }
    Ok(())
}

fn validate_budget(b: &Budget) -> Result<()> {
    if !(1..=12).contains(&b.month) {
        return Err(Error::Invalid(format!("month {} is outside 1-12", b.month)));
    }
    if b.amount < rust_decimal::Decimal::ZERO {
        return Err(Error::Invalid(format!(
            "budget amount {} must not be negative",
            b.amount
        )));
    }
    Ok(())
}
