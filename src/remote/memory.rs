// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{RemoteClient, RemoteTable};
use crate::error::RemoteError;

/// Which remote calls should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    None,
    /// Every call fails.
    All,
    /// Creates, updates and deletes fail; listing works.
    Writes,
    /// Listing one table fails.
    List(RemoteTable),
}

#[derive(Debug, Default)]
struct Tables {
    // keyed by creation sequence
    rows: BTreeMap<(RemoteTable, u64), Value>,
}

/// In-process remote backend. Rows are listed newest first, like the real
/// service, and carry `ROWID` and `CREATEDTIME`.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    tables: RwLock<Tables>,
    failure: RwLock<FailureMode>,
    seq: AtomicU64,
    calls: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail(&self, mode: FailureMode) {
        *self.failure.write().await = mode;
    }

    /// Number of remote calls served or refused so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stores a row as if another device had created it. Returns its id.
    pub async fn seed(&self, table: RemoteTable, mut body: Value) -> String {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("{}", 1_000_000 + seq);
        if let Value::Object(m) = &mut body {
            m.insert("ROWID".into(), json!(id));
            m.entry("CREATEDTIME")
                .or_insert_with(|| json!(format!("2025-01-01 00:00:00:{:03}", seq % 1000)));
        }
        self.tables.write().await.rows.insert((table, seq), body);
        id
    }

    /// Drops a row behind the client's back.
    pub async fn forget(&self, table: RemoteTable, remote_id: &str) -> bool {
        let mut t = self.tables.write().await;
        let key = find(&t, table, remote_id);
        key.and_then(|k| t.rows.remove(&k)).is_some()
    }

    pub async fn len(&self, table: RemoteTable) -> usize {
        self.tables
            .read()
            .await
            .rows
            .keys()
            .filter(|(t, _)| *t == table)
            .count()
    }

    pub async fn get(&self, table: RemoteTable, remote_id: &str) -> Option<Value> {
        let t = self.tables.read().await;
        find(&t, table, remote_id).and_then(|k| t.rows.get(&k).cloned())
    }

    async fn check(&self, write: bool, table: Option<RemoteTable>) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = match *self.failure.read().await {
            FailureMode::None => false,
            FailureMode::All => true,
            FailureMode::Writes => write,
            FailureMode::List(t) => !write && table == Some(t),
        };
        if failing {
            return Err(RemoteError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

fn find(t: &Tables, table: RemoteTable, remote_id: &str) -> Option<(RemoteTable, u64)> {
    t.rows
        .iter()
        .find(|((tbl, _), row)| *tbl == table && row.get("ROWID").and_then(Value::as_str) == Some(remote_id))
        .map(|(k, _)| *k)
}

#[async_trait]
impl RemoteClient for MemoryRemote {
    async fn create(&self, table: RemoteTable, body: Value) -> Result<String, RemoteError> {
        self.check(true, Some(table)).await?;
        if !body.is_object() {
            return Err(RemoteError::Status {
                code: 400,
                body: "request body must be an object".into(),
            });
        }
        Ok(self.seed(table, body).await)
    }

    async fn update(
        &self,
        table: RemoteTable,
        remote_id: &str,
        body: Value,
    ) -> Result<(), RemoteError> {
        self.check(true, Some(table)).await?;
        let mut t = self.tables.write().await;
        let key = find(&t, table, remote_id).ok_or_else(|| RemoteError::Status {
            code: 404,
            body: format!("{table} {remote_id} not found"),
        })?;
        if let (Some(Value::Object(row)), Value::Object(patch)) = (t.rows.get_mut(&key), body) {
            for (k, v) in patch {
                row.insert(k, v);
            }
        }
        Ok(())
    }

    async fn delete(&self, table: RemoteTable, remote_id: &str) -> Result<(), RemoteError> {
        self.check(true, Some(table)).await?;
        let mut t = self.tables.write().await;
        let key = find(&t, table, remote_id).ok_or_else(|| RemoteError::Status {
            code: 404,
            body: format!("{table} {remote_id} not found"),
        })?;
        t.rows.remove(&key);
        Ok(())
    }

    async fn list(
        &self,
        table: RemoteTable,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        self.check(false, Some(table)).await?;
        let t = self.tables.read().await;
        Ok(t.rows
            .iter()
            .rev()
            .filter(|((tbl, _), _)| *tbl == table)
            .skip(offset)
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn health(&self) -> Result<(), RemoteError> {
        self.check(false, None).await
    }
}
