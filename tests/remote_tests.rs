// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, TimeZone, Timelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tallyhub::models::{Budget, SyncState, Transaction, TransactionKind};
use tallyhub::remote::http::{envelope, parse_envelope};
use tallyhub::remote::memory::FailureMode;
use tallyhub::remote::records::remote_id_of;
use tallyhub::remote::{HttpRemote, MemoryRemote, RemoteClient, RemoteTable, SyncRecord};
use tallyhub::settings::RemoteConfig;
use tallyhub::{Error, RemoteError};

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn direct_envelope_yields_body() {
    let raw = json!({"statusCode": 200, "body": {"data": [{"ROWID": "1"}]}});
    let body = parse_envelope(&raw).unwrap();
    assert_eq!(body["data"][0]["ROWID"], "1");
}

#[test]
fn wrapped_envelope_is_unwrapped() {
    let inner = json!({"statusCode": 201, "body": {"data": {"ROWID": "77"}}}).to_string();
    let raw = json!({ "output": inner });
    let body = parse_envelope(&raw).unwrap();
    assert_eq!(body["data"]["ROWID"], "77");
}

#[test]
fn error_status_in_envelope() {
    let raw = json!({"statusCode": 404, "body": {"message": "gone"}});
    match parse_envelope(&raw) {
        Err(RemoteError::Status { code, body }) => {
            assert_eq!(code, 404);
            assert!(body.contains("gone"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn malformed_envelopes() {
    assert!(matches!(
        parse_envelope(&json!({"body": {}})),
        Err(RemoteError::Malformed(_))
    ));
    assert!(matches!(
        parse_envelope(&json!({"output": "not json"})),
        Err(RemoteError::Malformed(_))
    ));
}

#[test]
fn oversized_status_code_is_malformed() {
    let raw = json!({"statusCode": 70_000, "body": {}});
    assert!(matches!(
        parse_envelope(&raw),
        Err(RemoteError::Malformed(_))
    ));
}

#[test]
fn request_envelope_shape() {
    let e = envelope(
        RemoteTable::Budgets,
        "PUT",
        Some("12"),
        Some(json!({"category": "Food"})),
        None,
    );
    assert_eq!(
        e,
        json!({
            "operation": "budget",
            "method": "PUT",
            "resourceType": "budgets",
            "resourceId": "12",
            "requestBody": {"category": "Food"},
        })
    );

    let list = envelope(RemoteTable::Transactions, "GET", None, None, Some((100, 100)));
    assert_eq!(list["operation"], "transaction");
    assert_eq!(list["offset"], 100);
    assert!(list.get("resourceId").is_none());
}

#[test]
fn endpoint_is_built_from_base_and_function() {
    let r = HttpRemote::new("https://api.example.com/baas/v1/project/42", "ledger", None).unwrap();
    assert_eq!(
        r.endpoint().as_str(),
        "https://api.example.com/baas/v1/project/42/server/ledger/execute"
    );
    let r = HttpRemote::new("https://api.example.com/p/", "ledger", None).unwrap();
    assert_eq!(
        r.endpoint().as_str(),
        "https://api.example.com/p/server/ledger/execute"
    );
    assert!(matches!(
        HttpRemote::new("not a url", "ledger", None),
        Err(RemoteError::Malformed(_))
    ));
    assert!(matches!(
        HttpRemote::from_config(&RemoteConfig::default()),
        Err(RemoteError::NotConfigured)
    ));
}

#[test]
fn transaction_payload_and_parse() {
    let at = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
    let t = Transaction::new(d("42.5"), TransactionKind::Expense, "Food", Some("lunch"), at);
    let payload = t.to_payload();
    assert_eq!(payload["type"], "EXPENSE");
    assert_eq!(payload["amount"], 42.5);
    assert_eq!(payload["transactionDate"], at.timestamp_millis());

    let mut row = payload.clone();
    row["ROWID"] = json!(9001);
    let parsed = Transaction::from_remote(&row).unwrap();
    assert_eq!(parsed.remote_id.as_deref(), Some("9001"));
    assert_eq!(parsed.amount, d("42.5"));
    assert_eq!(parsed.kind, TransactionKind::Expense);
    assert_eq!(parsed.occurred_at, at);
    assert_eq!(parsed.description.as_deref(), Some("lunch"));
    assert_eq!(parsed.sync_state, SyncState::Synced);
    assert!(parsed.last_synced_at.is_some());
}

#[test]
fn nested_rows_and_string_amounts() {
    let row = json!({"transactions": {
        "ROWID": "5",
        "amount": "19.99",
        "type": "income",
        "category": "Gift",
        "description": "",
        "transactionDate": 1735689600000i64,
    }});
    let t = Transaction::from_remote(&row).unwrap();
    assert_eq!(t.amount, d("19.99"));
    assert_eq!(t.kind, TransactionKind::Income);
    assert!(t.description.is_none());
    assert_eq!(remote_id_of(&row, RemoteTable::Transactions).as_deref(), Some("5"));
}

#[test]
fn bad_transaction_rows_are_data_errors() {
    let base = json!({
        "ROWID": "5", "amount": 10, "type": "EXPENSE",
        "category": "Food", "transactionDate": 1735689600000i64,
    });
    let mut zero = base.clone();
    zero["amount"] = json!(0);
    let mut kind = base.clone();
    kind["type"] = json!("TRANSFER");
    let mut missing = base.clone();
    missing.as_object_mut().unwrap().remove("category");
    let mut no_id = base.clone();
    no_id.as_object_mut().unwrap().remove("ROWID");

    for row in [zero, kind, missing, no_id, json!("nope")] {
        assert!(
            matches!(Transaction::from_remote(&row), Err(Error::Data(_))),
            "{row}"
        );
    }
}

#[test]
fn budget_rows_accept_loose_fields() {
    let row = json!({
        "ROWID": "31",
        "category": "Food",
        "budgetAmount": "200.00",
        "budgetMonth": "3",
        "year": "2025",
        "isActive": "false",
        "CREATEDTIME": "2025-03-01 09:15:30:250",
    });
    let b = Budget::from_remote(&row).unwrap();
    assert_eq!(b.remote_id.as_deref(), Some("31"));
    assert_eq!(b.amount, d("200"));
    assert_eq!((b.month, b.year), (3, 2025));
    assert!(!b.is_active);
    assert_eq!(b.created_at.day(), 1);
    assert_eq!(b.created_at.hour(), 9);
    assert_eq!(b.created_at.timestamp_subsec_millis(), 250);

    let plain = json!({
        "ROWID": 32, "category": "Rent", "budgetAmount": 900,
        "month": 12, "year": 2024,
    });
    let b = Budget::from_remote(&plain).unwrap();
    assert_eq!((b.month, b.year), (12, 2024));
    assert!(b.is_active);
}

#[test]
fn bad_budget_rows_are_rejected() {
    let out_of_range = json!({
        "ROWID": "1", "category": "Food", "budgetAmount": 10, "month": 13, "year": 2025,
    });
    let negative = json!({
        "ROWID": "2", "category": "Food", "budgetAmount": -1, "month": 1, "year": 2025,
    });
    let no_month = json!({
        "ROWID": "3", "category": "Food", "budgetAmount": 1, "year": 2025,
    });
    for row in [out_of_range, negative, no_month] {
        assert!(matches!(Budget::from_remote(&row), Err(Error::Data(_))), "{row}");
    }
}

#[test]
fn amounts_beyond_the_cap_are_data_errors() {
    let tx = json!({
        "ROWID": "5", "amount": "50000000000000000000000000000", "type": "EXPENSE",
        "category": "Food", "transactionDate": 1735689600000i64,
    });
    assert!(matches!(Transaction::from_remote(&tx), Err(Error::Data(_))));
    let budget = json!({
        "ROWID": "6", "category": "Food", "budgetAmount": 5e28, "month": 1, "year": 2025,
    });
    assert!(matches!(Budget::from_remote(&budget), Err(Error::Data(_))));
}

#[tokio::test]
async fn memory_remote_lists_newest_first() {
    let remote = MemoryRemote::new();
    let first = remote
        .seed(RemoteTable::Budgets, json!({"category": "A"}))
        .await;
    let second = remote
        .create(RemoteTable::Budgets, json!({"category": "B"}))
        .await
        .unwrap();
    remote
        .seed(RemoteTable::Transactions, json!({"category": "T"}))
        .await;

    let rows = remote.list(RemoteTable::Budgets, 0, 10).await.unwrap();
    let ids: Vec<String> = rows
        .iter()
        .map(|r| remote_id_of(r, RemoteTable::Budgets).unwrap())
        .collect();
    assert_eq!(ids, vec![second.clone(), first]);
    assert_eq!(remote.list(RemoteTable::Budgets, 1, 10).await.unwrap().len(), 1);

    remote
        .update(RemoteTable::Budgets, &second, json!({"category": "C"}))
        .await
        .unwrap();
    assert_eq!(
        remote.get(RemoteTable::Budgets, &second).await.unwrap()["category"],
        "C"
    );
    remote.delete(RemoteTable::Budgets, &second).await.unwrap();
    assert!(matches!(
        remote.delete(RemoteTable::Budgets, &second).await,
        Err(RemoteError::Status { code: 404, .. })
    ));
    assert_eq!(remote.len(RemoteTable::Budgets).await, 1);
}

#[tokio::test]
async fn memory_remote_failure_modes() {
    let remote = MemoryRemote::new();
    remote.fail(FailureMode::Writes).await;
    assert!(remote.create(RemoteTable::Budgets, json!({})).await.is_err());
    assert!(remote.list(RemoteTable::Budgets, 0, 1).await.is_ok());

    remote.fail(FailureMode::List(RemoteTable::Budgets)).await;
    assert!(remote.list(RemoteTable::Budgets, 0, 1).await.is_err());
    assert!(remote.list(RemoteTable::Transactions, 0, 1).await.is_ok());

    remote.fail(FailureMode::All).await;
    assert!(matches!(
        remote.health().await,
        Err(RemoteError::Unavailable(_))
    ));
    assert_eq!(remote.calls(), 5);
}
