// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

use super::{RemoteClient, RemoteTable};
use crate::error::RemoteError;
use crate::settings::RemoteConfig;

const UA: &str = concat!(
    "tallyhub/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/tallyhub)"
);

/// Remote backend reached through a server-side function that takes a
/// JSON envelope describing the operation.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    endpoint: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: &str, function: &str, token: Option<String>) -> Result<Self, RemoteError> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&base)
            .map_err(|e| RemoteError::Malformed(format!("invalid remote url: {e}")))?;
        let endpoint = base
            .join(&format!("server/{function}/execute"))
            .map_err(|e| RemoteError::Malformed(format!("invalid remote url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(UA)
            .build()?;
        Ok(Self {
            endpoint,
            token,
            http,
        })
    }

    pub fn from_config(cfg: &RemoteConfig) -> Result<Self, RemoteError> {
        let url = cfg.url.as_deref().ok_or(RemoteError::NotConfigured)?;
        Self::new(url, &cfg.function, cfg.token.clone())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn execute(&self, envelope: Value) -> Result<Value, RemoteError> {
        debug!(endpoint = %self.endpoint, %envelope, "remote call");
        let mut req = self.http.post(self.endpoint.clone()).json(&envelope);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                code: status.as_u16(),
                body: text,
            });
        }
        let raw: Value = serde_json::from_str(&text)
            .map_err(|e| RemoteError::Malformed(format!("response is not json: {e}")))?;
        parse_envelope(&raw)
    }
}

/// Builds the request envelope for one operation.
pub fn envelope(
    table: RemoteTable,
    method: &str,
    resource_id: Option<&str>,
    body: Option<Value>,
    page: Option<(usize, usize)>,
) -> Value {
    let mut m = Map::new();
    m.insert("operation".into(), json!(table.operation()));
    m.insert("method".into(), json!(method));
    m.insert("resourceType".into(), json!(table.as_str()));
    if let Some(id) = resource_id {
        m.insert("resourceId".into(), json!(id));
    }
    if let Some(b) = body {
        m.insert("requestBody".into(), b);
    }
    if let Some((offset, limit)) = page {
        m.insert("offset".into(), json!(offset));
        m.insert("limit".into(), json!(limit));
    }
    Value::Object(m)
}

/// Unwraps a function response, accepting both the direct form
/// `{"statusCode":..,"body":{..}}` and the wrapped form
/// `{"output":"<json string>"}`. Returns the body on a 2xx status code.
pub fn parse_envelope(raw: &Value) -> Result<Value, RemoteError> {
    let unwrapped;
    let resp = match raw.get("output") {
        Some(Value::String(s)) => {
            unwrapped = serde_json::from_str::<Value>(s)
                .map_err(|e| RemoteError::Malformed(format!("output is not json: {e}")))?;
            &unwrapped
        }
        Some(other @ Value::Object(_)) => other,
        _ => raw,
    };
    let code = resp
        .get("statusCode")
        .and_then(Value::as_u64)
        .ok_or_else(|| RemoteError::Malformed("missing statusCode".into()))?;
    let body = resp.get("body").cloned().unwrap_or(Value::Null);
    if !(200..300).contains(&code) {
        let code = u16::try_from(code)
            .map_err(|_| RemoteError::Malformed(format!("statusCode {code} out of range")))?;
        return Err(RemoteError::Status {
            code,
            body: body.to_string(),
        });
    }
    Ok(body)
}

fn created_id(body: &Value) -> Result<String, RemoteError> {
    match body.pointer("/data/ROWID") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(RemoteError::Malformed("response carries no data.ROWID".into())),
    }
}

#[async_trait]
impl RemoteClient for HttpRemote {
    async fn create(&self, table: RemoteTable, body: Value) -> Result<String, RemoteError> {
        let resp = self
            .execute(envelope(table, "POST", None, Some(body), None))
            .await?;
        created_id(&resp)
    }

    async fn update(
        &self,
        table: RemoteTable,
        remote_id: &str,
        body: Value,
    ) -> Result<(), RemoteError> {
        self.execute(envelope(table, "PUT", Some(remote_id), Some(body), None))
            .await?;
        Ok(())
    }

    async fn delete(&self, table: RemoteTable, remote_id: &str) -> Result<(), RemoteError> {
        self.execute(envelope(table, "DELETE", Some(remote_id), None, None))
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        table: RemoteTable,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        let resp = self
            .execute(envelope(table, "GET", None, None, Some((offset, limit))))
            .await?;
        match resp.get("data") {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            _ => Err(RemoteError::Malformed(format!(
                "{table} page is not an array"
            ))),
        }
    }

    async fn health(&self) -> Result<(), RemoteError> {
        self.list(RemoteTable::Transactions, 0, 1).await.map(|_| ())
    }
}
