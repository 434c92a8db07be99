// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Mapping between local records and remote rows.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};
use std::str::FromStr;

use super::RemoteTable;
use crate::error::{Error, Result};
use crate::models::{Budget, MAX_AMOUNT, SyncState, Transaction, TransactionKind};
use crate::store::from_millis;

const CREATED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S:%3f";

/// A locally stored record that has a remote counterpart.
pub trait SyncRecord: Clone + Send + Sync + Sized {
    const TABLE: RemoteTable;
    const ENTITY: &'static str;

    fn local_id(&self) -> i64;
    fn remote_id(&self) -> Option<&str>;
    fn sync_state(&self) -> SyncState;
    /// Request body for create/update.
    fn to_payload(&self) -> Value;
    /// Parses one listed row. The result is marked synced.
    fn from_remote(row: &Value) -> Result<Self>;
    fn mark_synced(&mut self, remote_id: String, at: DateTime<Utc>);
}

impl SyncRecord for Transaction {
    const TABLE: RemoteTable = RemoteTable::Transactions;
    const ENTITY: &'static str = "transaction";

    fn local_id(&self) -> i64 {
        self.id
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    fn to_payload(&self) -> Value {
        json!({
            "amount": decimal_number(self.amount),
            "type": self.kind.as_str(),
            "category": self.category,
            "description": self.description.clone().unwrap_or_default(),
            "transactionDate": self.occurred_at.timestamp_millis(),
        })
    }

    fn from_remote(row: &Value) -> Result<Self> {
        let r = unwrap_row(row, "transactions")?;
        let remote_id = row_id(r)?;
        let amount = decimal_field(r, "amount")?;
        if amount <= Decimal::ZERO {
            return Err(Error::Data(format!(
                "transaction {remote_id}: amount {amount} must be positive"
            )));
        }
        let kind = str_field(r, "type")?
            .parse::<TransactionKind>()
            .map_err(|e| Error::Data(format!("transaction {remote_id}: {e}")))?;
        let millis = int_field(r, "transactionDate")?;
        let occurred_at = from_millis(millis).ok_or_else(|| {
            Error::Data(format!("transaction {remote_id}: date {millis} out of range"))
        })?;
        let description = r
            .get("description")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut tx = Transaction::new(
            amount,
            kind,
            str_field(r, "category")?,
            description.as_deref(),
            occurred_at,
        );
        tx.mark_synced(remote_id, Utc::now());
        Ok(tx)
    }

    fn mark_synced(&mut self, remote_id: String, at: DateTime<Utc>) {
        self.remote_id = Some(remote_id);
        self.sync_state = SyncState::Synced;
        self.last_synced_at = Some(at);
    }
}

impl SyncRecord for Budget {
    const TABLE: RemoteTable = RemoteTable::Budgets;
    const ENTITY: &'static str = "budget";

    fn local_id(&self) -> i64 {
        self.id
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    fn to_payload(&self) -> Value {
        json!({
            "category": self.category,
            "budgetAmount": decimal_number(self.amount),
            "month": self.month,
            "year": self.year,
            "isActive": self.is_active,
            "createdDate": self.created_at.timestamp_millis(),
        })
    }

    fn from_remote(row: &Value) -> Result<Self> {
        let r = unwrap_row(row, "budgets")?;
        let remote_id = row_id(r)?;
        let amount = decimal_field(r, "budgetAmount")?;
        if amount < Decimal::ZERO {
            return Err(Error::Data(format!(
                "budget {remote_id}: amount {amount} must not be negative"
            )));
        }
        let month = match r.get("budgetMonth") {
            Some(v) if !v.is_null() => loose_int(v, "budgetMonth")?,
            _ => loose_int(required(r, "month")?, "month")?,
        };
        if !(1..=12).contains(&month) {
            return Err(Error::Data(format!(
                "budget {remote_id}: month {month} outside 1-12"
            )));
        }
        let year = loose_int(required(r, "year")?, "year")?;
        let year = i32::try_from(year)
            .map_err(|_| Error::Data(format!("budget {remote_id}: year {year} out of range")))?;
        let is_active = match r.get("isActive") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(other) => {
                return Err(Error::Data(format!("isActive: unexpected {other}")));
            }
        };

        let mut b = Budget::new(str_field(r, "category")?, amount, month as u32, year);
        b.is_active = is_active;
        if let Some(created) = r
            .get("CREATEDTIME")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDateTime::parse_from_str(s, CREATED_TIME_FORMAT).ok())
        {
            b.created_at = created.and_utc();
        }
        b.mark_synced(remote_id, Utc::now());
        Ok(b)
    }

    fn mark_synced(&mut self, remote_id: String, at: DateTime<Utc>) {
        self.remote_id = Some(remote_id);
        self.sync_state = SyncState::Synced;
        self.last_synced_at = Some(at);
    }
}

/// Rows may arrive nested under their table name.
fn unwrap_row<'v>(row: &'v Value, table: &str) -> Result<&'v Map<String, Value>> {
    let inner = match row.get(table) {
        Some(nested @ Value::Object(_)) => nested,
        _ => row,
    };
    inner
        .as_object()
        .ok_or_else(|| Error::Data(format!("expected an object row, got {row}")))
}

fn required<'v>(r: &'v Map<String, Value>, key: &str) -> Result<&'v Value> {
    match r.get(key) {
        Some(Value::Null) | None => Err(Error::Data(format!("missing field '{key}'"))),
        Some(v) => Ok(v),
    }
}

fn row_id(r: &Map<String, Value>) -> Result<String> {
    match required(r, "ROWID")? {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::Data(format!("ROWID: unexpected {other}"))),
    }
}

fn str_field<'v>(r: &'v Map<String, Value>, key: &str) -> Result<&'v str> {
    required(r, key)?
        .as_str()
        .ok_or_else(|| Error::Data(format!("field '{key}' is not a string")))
}

fn int_field(r: &Map<String, Value>, key: &str) -> Result<i64> {
    let v = required(r, key)?;
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
        .ok_or_else(|| Error::Data(format!("field '{key}' is not an integer")))
}

/// An integer given either as a number or as a numeric string.
fn loose_int(v: &Value, key: &str) -> Result<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::Data(format!("field '{key}' is not an integer: {v}")))
}

fn decimal_field(r: &Map<String, Value>, key: &str) -> Result<Decimal> {
    let text = match required(r, key)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(Error::Data(format!("field '{key}': unexpected {other}"))),
    };
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| Error::Data(format!("field '{key}': invalid amount '{text}'")))?;
    if amount.abs() > MAX_AMOUNT {
        return Err(Error::Data(format!(
            "field '{key}': amount {amount} exceeds {MAX_AMOUNT}"
        )));
    }
    Ok(amount)
}

fn decimal_number(d: Decimal) -> Value {
    d.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(d.to_string()))
}

/// The remote id of a listed row, if it has a readable one.
pub fn remote_id_of(row: &Value, table: RemoteTable) -> Option<String> {
    unwrap_row(row, table.as_str())
        .ok()
        .and_then(|r| row_id(r).ok())
}
