use crate::error::{ControllerError, Result};
use crate::traits::{ObjectStore, SimpleAppSource};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use simpleapp_core::{GroupVersionKind, ResourceKey, SimpleApp};
use tracing::{debug, warn};

/// Lightweight HTTP client for talking to a Kubernetes-compatible API server
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Collection URL for SimpleApps, cluster-wide or in one namespace
    fn simple_app_list_url(&self, namespace: Option<&str>) -> String {
        let gvk = GroupVersionKind::simple_app();
        match namespace {
            Some(ns) => self.url(&ResourceKey::new(gvk, ns, "").collection_path()),
            None => self.url(&format!("/{}/{}", gvk.api_path(), gvk.resource_name())),
        }
    }

    async fn send(&self, method: &str, url: &str, request: reqwest::RequestBuilder) -> Result<Response> {
        debug!("{} {}", method, url);
        request
            .send()
            .await
            .map_err(|e| ControllerError::api_request_failed(method, url, e.to_string()))
    }

    async fn read_json(method: &str, url: &str, resp: Response) -> Result<Value> {
        resp.json::<Value>().await.map_err(|e| {
            ControllerError::serialization_error(
                format!("Failed to parse response of {} {}: {}", method, url, e),
                Some(Box::new(e)),
            )
        })
    }

    async fn failure(method: &str, url: &str, resp: Response) -> ControllerError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        ControllerError::api_request_failed(method, url, format!("status {}: {}", status, body))
    }

    /// GET returning `None` on 404
    async fn get_json(&self, url: &str) -> Result<Option<Value>> {
        let resp = self.send("GET", url, self.client.get(url)).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::failure("GET", url, resp).await);
        }

        Self::read_json("GET", url, resp).await.map(Some)
    }
}

fn decode_simple_app(value: Value) -> Result<SimpleApp> {
    serde_json::from_value(value).map_err(|e| {
        ControllerError::serialization_error(
            format!("Failed to parse SimpleApp: {}", e),
            Some(Box::new(e)),
        )
    })
}

#[async_trait]
impl SimpleAppSource for ApiClient {
    async fn get_simple_app(&self, key: &ResourceKey) -> Result<Option<SimpleApp>> {
        let url = self.url(&key.api_path());
        self.get_json(&url).await?.map(decode_simple_app).transpose()
    }

    async fn list_simple_apps(&self, namespace: Option<&str>) -> Result<Vec<SimpleApp>> {
        let url = self.simple_app_list_url(namespace);
        let body = self
            .get_json(&url)
            .await?
            .ok_or_else(|| {
                ControllerError::api_request_failed(
                    "GET",
                    &url,
                    "SimpleApp collection not found, is the CRD installed?",
                )
            })?;

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // One malformed record must not hide the others
        let mut apps = Vec::with_capacity(items.len());
        for item in items {
            let namespace = item
                .pointer("/metadata/namespace")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let name = item
                .pointer("/metadata/name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();
            match decode_simple_app(item) {
                Ok(app) => apps.push(app),
                Err(e) => warn!("Skipping SimpleApp {}/{}: {}", namespace, name, e),
            }
        }

        Ok(apps)
    }
}

#[async_trait]
impl ObjectStore for ApiClient {
    async fn get_object(&self, key: &ResourceKey) -> Result<Option<Value>> {
        self.get_json(&self.url(&key.api_path())).await
    }

    async fn create_object(&self, key: &ResourceKey, object: &Value) -> Result<Value> {
        let url = self.url(&key.collection_path());
        let resp = self.send("POST", &url, self.client.post(&url).json(object)).await?;

        if resp.status() == StatusCode::CONFLICT {
            return Err(ControllerError::already_exists(key.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Self::failure("POST", &url, resp).await);
        }

        Self::read_json("POST", &url, resp).await
    }

    async fn replace_object(&self, key: &ResourceKey, object: &Value) -> Result<Value> {
        let url = self.url(&key.api_path());
        let resp = self.send("PUT", &url, self.client.put(&url).json(object)).await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(ControllerError::not_found(key.to_string())),
            StatusCode::CONFLICT => {
                let expected = object
                    .pointer("/metadata/resourceVersion")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Err(ControllerError::conflict(key.to_string(), expected, "unknown"))
            }
            s if s.is_success() => Self::read_json("PUT", &url, resp).await,
            _ => Err(Self::failure("PUT", &url, resp).await),
        }
    }

    async fn delete_object(&self, key: &ResourceKey) -> Result<()> {
        let url = self.url(&key.api_path());
        let resp = self.send("DELETE", &url, self.client.delete(&url)).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ControllerError::not_found(key.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Self::failure("DELETE", &url, resp).await);
        }

        Ok(())
    }
}
