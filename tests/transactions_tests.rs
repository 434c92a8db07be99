// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tallyhub::commands::{App, transactions};
use tallyhub::models::{SyncState, TransactionKind};
use tallyhub::store::Store;
use tallyhub::{cli, settings};

fn setup(args: &[&str]) -> App {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let matches = cli::build_cli().get_matches_from(args.iter().copied());
    App::new(store, &matches)
}

async fn run(app: &App, args: &[&str]) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from(args.iter().copied());
    let (_, tx) = matches.subcommand().unwrap();
    transactions::handle(app, tx).await
}

#[tokio::test]
async fn add_without_remote_is_kept_for_retry() {
    let app = setup(&["tallyhub", "init"]);
    run(
        &app,
        &[
            "tallyhub", "tx", "add", "--amount", "12.50", "--category", "Food", "--date",
            "2025-01-05", "--description", "lunch",
        ],
    )
    .await
    .unwrap();

    let txs = app.store.list_transactions(None).unwrap();
    assert_eq!(txs.len(), 1);
    let t = &txs[0];
    assert_eq!(t.kind, TransactionKind::Expense);
    assert_eq!(t.amount.to_string(), "12.50");
    assert_eq!(t.occurred_at, Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap());
    assert_eq!(t.description.as_deref(), Some("lunch"));
    // no remote configured: stored, push failed
    assert_eq!(t.sync_state, SyncState::SyncFailed);
}

#[tokio::test]
async fn add_with_sync_disabled_stays_local() {
    let app = setup(&["tallyhub", "init"]);
    settings::set_sync_enabled(&app.store.conn(), false).unwrap();
    run(
        &app,
        &["tallyhub", "tx", "add", "--amount", "900", "--kind", "income", "--category", "Salary"],
    )
    .await
    .unwrap();
    let t = &app.store.list_transactions(None).unwrap()[0];
    assert_eq!(t.kind, TransactionKind::Income);
    assert_eq!(t.sync_state, SyncState::Local);
}

#[tokio::test]
async fn add_rejects_non_positive_amounts() {
    let app = setup(&["tallyhub", "init"]);
    let err = run(
        &app,
        &["tallyhub", "tx", "add", "--amount", "0", "--category", "Food"],
    )
    .await;
    assert!(err.is_err());
    assert!(app.store.list_transactions(None).unwrap().is_empty());
}

#[tokio::test]
async fn edit_updates_fields_and_clears_description() {
    let app = setup(&["tallyhub", "init"]);
    settings::set_sync_enabled(&app.store.conn(), false).unwrap();
    run(
        &app,
        &[
            "tallyhub", "tx", "add", "--amount", "10", "--category", "Food", "--description",
            "snack",
        ],
    )
    .await
    .unwrap();
    let id = app.store.list_transactions(None).unwrap()[0].id.to_string();

    run(
        &app,
        &[
            "tallyhub", "tx", "edit", &id, "--amount", "11", "--category", "Groceries",
            "--description", "",
        ],
    )
    .await
    .unwrap();
    let t = &app.store.list_transactions(None).unwrap()[0];
    assert_eq!(t.amount.to_string(), "11");
    assert_eq!(t.category, "Groceries");
    assert!(t.description.is_none());
    assert_eq!(t.sync_state, SyncState::Local);
}

#[tokio::test]
async fn rm_unknown_id_fails() {
    let app = setup(&["tallyhub", "init"]);
    assert!(run(&app, &["tallyhub", "tx", "rm", "77"]).await.is_err());
}

#[tokio::test]
async fn list_limit_respected() {
    let app = setup(&["tallyhub", "init"]);
    settings::set_sync_enabled(&app.store.conn(), false).unwrap();
    for day in ["2025-01-01", "2025-01-02", "2025-01-03"] {
        run(
            &app,
            &["tallyhub", "tx", "add", "--amount", "1", "--category", "Food", "--date", day],
        )
        .await
        .unwrap();
    }
    let matches = cli::build_cli().get_matches_from(["tallyhub", "tx", "list", "--limit", "2"]);
    let (_, tx) = matches.subcommand().unwrap();
    let (_, list) = tx.subcommand().unwrap();
    assert_eq!(list.get_one::<usize>("limit"), Some(&2));
    transactions::handle(&app, tx).await.unwrap();
    assert_eq!(app.store.list_transactions(Some(2)).unwrap().len(), 2);
}

#[test]
fn remote_overrides_come_from_global_flags() {
    let app = setup(&[
        "tallyhub",
        "--remote-url",
        "https://api.example.com/p",
        "--remote-token",
        "t0k",
        "sync",
        "status",
    ]);
    assert_eq!(app.remote_url.as_deref(), Some("https://api.example.com/p"));
    assert_eq!(app.remote_token.as_deref(), Some("t0k"));
    assert!(app.reconciler().is_ok());
}
