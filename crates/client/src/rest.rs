// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of the remote document store.
//!
//! Talks to the hosted database through its REST document façade:
//!
//! - `GET    {base}/v1/{path}` - read a document (404 → absent)
//! - `PATCH  {base}/v1/{path}` - merge-write a document
//! - `PUT    {base}/v1/{path}` - replace a document
//! - `POST   {base}/v1/{collection}` - append, response carries `{"id": ...}`
//!
//! Requests authenticate with an optional bearer token. Timeouts are
//! whatever the underlying HTTP client enforces.

use std::future::Future;
use std::pin::Pin;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::remote::{DocPath, RemoteError, RemoteResult, RemoteStore};

/// Remote store backed by the database's REST document endpoint.
pub struct HttpRemoteStore {
    http: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteStore {
    /// Creates a store for the given endpoint base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpRemoteStore { http: Client::new(), base_url: base_url.into(), auth_token: None }
    }

    /// Attaches a bearer token sent with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn document_url(&self, path: &DocPath) -> String {
        format!("{}/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

async fn error_for_status(resp: reqwest::Response) -> RemoteError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    RemoteError::Status { status, body }
}

impl RemoteStore for HttpRemoteStore {
    fn get(
        &mut self,
        path: &DocPath,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Option<Value>>> + Send + '_>> {
        let req = self.request(Method::GET, &self.document_url(path));
        Box::pin(async move {
            let resp =
                req.send().await.map_err(|e| RemoteError::RequestFailed(e.to_string()))?;

            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(error_for_status(resp).await);
            }

            let doc = resp
                .json()
                .await
                .map_err(|e| RemoteError::InvalidDocument(e.to_string()))?;
            Ok(Some(doc))
        })
    }

    fn put(
        &mut self,
        path: &DocPath,
        doc: Value,
        merge: bool,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<()>> + Send + '_>> {
        let method = if merge { Method::PATCH } else { Method::PUT };
        let req = self.request(method, &self.document_url(path)).json(&doc);
        Box::pin(async move {
            let resp =
                req.send().await.map_err(|e| RemoteError::RequestFailed(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(error_for_status(resp).await);
            }
            Ok(())
        })
    }

    fn add(
        &mut self,
        collection: &DocPath,
        doc: Value,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<String>> + Send + '_>> {
        let req = self.request(Method::POST, &self.document_url(collection)).json(&doc);
        Box::pin(async move {
            let resp =
                req.send().await.map_err(|e| RemoteError::RequestFailed(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(error_for_status(resp).await);
            }

            let body: Value = resp
                .json()
                .await
                .map_err(|e| RemoteError::InvalidDocument(e.to_string()))?;
            body.get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    RemoteError::InvalidDocument("append response missing 'id'".to_string())
                })
        })
    }
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
