// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Tallyhub", "tallyhub"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("tallyhub.sqlite"))
}

pub fn open_at(path: &std::path::Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn).context("Failed to initialize schema")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        amount TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('INCOME','EXPENSE')),
        category TEXT NOT NULL,
        description TEXT,
        occurred_at INTEGER NOT NULL, -- unix millis, UTC
        remote_id TEXT,
        sync_state TEXT NOT NULL DEFAULT 'LOCAL',
        last_synced_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_occurred ON transactions(occurred_at);
    CREATE INDEX IF NOT EXISTS idx_transactions_sync ON transactions(sync_state);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_remote
        ON transactions(remote_id) WHERE remote_id IS NOT NULL;

    -- no uniqueness on (category, month, year): duplicates are removed by cleanup
    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        amount TEXT NOT NULL,
        month INTEGER NOT NULL CHECK(month BETWEEN 1 AND 12),
        year INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        remote_id TEXT,
        sync_state TEXT NOT NULL DEFAULT 'LOCAL',
        last_synced_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_budgets_period ON budgets(year, month, category);
    CREATE INDEX IF NOT EXISTS idx_budgets_sync ON budgets(sync_state);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_budgets_remote
        ON budgets(remote_id) WHERE remote_id IS NOT NULL;
    "#,
    )
}
