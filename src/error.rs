// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("malformed remote record: {0}")]
    Data(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{0} has no remote id")]
    MissingRemoteId(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("a sync operation is already in progress")]
    SyncInProgress,
}

/// Failures of the remote backend. Always captured as a value, never raised
/// past the reconciler.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote returned status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("malformed remote response: {0}")]
    Malformed(String),
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("remote backend is not configured")]
    NotConfigured,
}
