// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod analytics;
pub mod budgets;
pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod period;
pub mod remote;
pub mod settings;
pub mod store;
pub mod sync;
pub mod utils;

pub use error::{Error, RemoteError, Result};
