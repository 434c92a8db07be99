// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::Weekday;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::Currency;

pub const SYNC_ENABLED: &str = "sync.enabled";
pub const REMOTE_URL: &str = "remote.url";
pub const REMOTE_TOKEN: &str = "remote.token";
pub const REMOTE_FUNCTION: &str = "remote.function";
pub const CURRENCY: &str = "currency";
pub const WEEK_START: &str = "week.start";

pub const DEFAULT_REMOTE_FUNCTION: &str = "finance_function";

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?)
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn unset(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM settings WHERE key=?1", params![key])?;
    Ok(())
}

pub fn sync_enabled(conn: &Connection) -> Result<bool> {
    Ok(get(conn, SYNC_ENABLED)?
        .map(|v| v == "true")
        .unwrap_or(true))
}

pub fn set_sync_enabled(conn: &Connection, enabled: bool) -> Result<()> {
    set(conn, SYNC_ENABLED, if enabled { "true" } else { "false" })
}

pub fn currency(conn: &Connection) -> Result<Currency> {
    Ok(get(conn, CURRENCY)?
        .map(|c| Currency::from_code(&c))
        .unwrap_or(Currency::DEFAULT))
}

pub fn set_currency(conn: &Connection, currency: Currency) -> Result<()> {
    set(conn, CURRENCY, currency.code())
}

pub fn week_start(conn: &Connection) -> Result<Weekday> {
    match get(conn, WEEK_START)? {
        Some(v) => parse_weekday(&v),
        None => Ok(Weekday::Mon),
    }
}

pub fn set_week_start(conn: &Connection, day: Weekday) -> Result<()> {
    set(conn, WEEK_START, &day.to_string())
}

pub fn parse_weekday(s: &str) -> Result<Weekday> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| Error::Invalid(format!("unknown weekday '{}'", s)))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteConfig {
    pub url: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub function: String,
}

pub fn remote_config(conn: &Connection) -> Result<RemoteConfig> {
    Ok(RemoteConfig {
        url: get(conn, REMOTE_URL)?,
        token: get(conn, REMOTE_TOKEN)?,
        function: get(conn, REMOTE_FUNCTION)?
            .unwrap_or_else(|| DEFAULT_REMOTE_FUNCTION.to_string()),
    })
}

pub fn set_remote_config(conn: &Connection, cfg: &RemoteConfig) -> Result<()> {
    match &cfg.url {
        Some(u) => set(conn, REMOTE_URL, u)?,
        None => unset(conn, REMOTE_URL)?,
    }
    match &cfg.token {
        Some(t) => set(conn, REMOTE_TOKEN, t)?,
        None => unset(conn, REMOTE_TOKEN)?,
    }
    set(conn, REMOTE_FUNCTION, &cfg.function)
}
