// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Remote backend contract plus the HTTP and in-process implementations.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::error::RemoteError;

pub mod http;
pub mod memory;
pub mod records;

pub use http::HttpRemote;
pub use memory::MemoryRemote;
pub use records::SyncRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteTable {
    Transactions,
    Budgets,
}

impl RemoteTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteTable::Transactions => "transactions",
            RemoteTable::Budgets => "budgets",
        }
    }

    /// Operation name used in the function envelope.
    pub fn operation(&self) -> &'static str {
        match self {
            RemoteTable::Transactions => "transaction",
            RemoteTable::Budgets => "budget",
        }
    }
}

impl fmt::Display for RemoteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record CRUD and paginated listing against the remote source of truth.
///
/// Listings are ordered by remote creation time, newest first. Every call
/// returns its failure as a value.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Creates a record and returns its remote id.
    async fn create(&self, table: RemoteTable, body: Value) -> Result<String, RemoteError>;

    async fn update(
        &self,
        table: RemoteTable,
        remote_id: &str,
        body: Value,
    ) -> Result<(), RemoteError>;

    async fn delete(&self, table: RemoteTable, remote_id: &str) -> Result<(), RemoteError>;

    async fn list(
        &self,
        table: RemoteTable,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError>;

    async fn health(&self) -> Result<(), RemoteError>;
}

/// Stand-in used until a remote endpoint is configured. Every call fails
/// with [`RemoteError::NotConfigured`], so writes stay local and are picked
/// up by a later retry pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl RemoteClient for Unconfigured {
    async fn create(&self, _table: RemoteTable, _body: Value) -> Result<String, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn update(
        &self,
        _table: RemoteTable,
        _remote_id: &str,
        _body: Value,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn delete(&self, _table: RemoteTable, _remote_id: &str) -> Result<(), RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn list(
        &self,
        _table: RemoteTable,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn health(&self) -> Result<(), RemoteError> {
        Err(RemoteError::NotConfigured)
    }
}
