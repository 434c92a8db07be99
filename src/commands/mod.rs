// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::models::Currency;
use crate::remote::{HttpRemote, RemoteClient, Unconfigured};
use crate::store::Store;
use crate::sync::Reconciler;

pub mod analytics;
pub mod budgets;
pub mod settings;
pub mod sync;
pub mod transactions;

/// What every handler needs: the store plus per-run remote overrides.
pub struct App {
    pub store: Arc<Store>,
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
}

impl App {
    pub fn new(store: Arc<Store>, m: &clap::ArgMatches) -> Self {
        Self {
            store,
            remote_url: m.get_one::<String>("remote-url").cloned(),
            remote_token: m.get_one::<String>("remote-token").cloned(),
        }
    }

    pub fn remote(&self) -> Result<Arc<dyn RemoteClient>> {
        let mut cfg = crate::settings::remote_config(&self.store.conn())?;
        if let Some(url) = &self.remote_url {
            cfg.url = Some(url.clone());
        }
        if let Some(token) = &self.remote_token {
            cfg.token = Some(token.clone());
        }
        if cfg.url.is_none() {
            return Ok(Arc::new(Unconfigured));
        }
        let remote = HttpRemote::from_config(&cfg).context("Invalid remote configuration")?;
        Ok(Arc::new(remote))
    }

    pub fn reconciler(&self) -> Result<Reconciler> {
        Ok(Reconciler::new(self.store.clone(), self.remote()?)?)
    }

    pub fn currency(&self) -> Result<Currency> {
        Ok(crate::settings::currency(&self.store.conn())?)
    }
}

pub(crate) fn required<'a>(m: &'a clap::ArgMatches, name: &str) -> Result<&'a String> {
    m.get_one::<String>(name)
        .with_context(|| format!("Missing required argument '{}'", name))
}

pub(crate) fn required_id(m: &clap::ArgMatches) -> Result<i64> {
    m.get_one::<i64>("id")
        .copied()
        .context("Missing required argument 'id'")
}
