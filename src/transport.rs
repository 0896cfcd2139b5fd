//! HTTP access to the charger web interface
//!
//! The [`Transport`] trait is the seam between protocol logic (session
//! handling, poll cycle) and the HTTP client. Implementations return the
//! status code and, for successful responses, the decoded JSON body.

use crate::config::DeviceConfig;
use crate::error::Result;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use std::time::Duration;

pub const LOGIN_PATH: &str = "/json/login";
pub const DASHBOARD_PATH: &str = "/json/dashboard.json";

/// Status code plus decoded body; the body is `Null` for non-success statuses
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

impl HttpReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Value::Null,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// GET `path`, optionally presenting a session id in `Authorization`
    async fn get_json(&self, path: &str, session_id: Option<&str>) -> Result<HttpReply>;

    /// POST a JSON body to `path`
    async fn post_json(&self, path: &str, body: &Value) -> Result<HttpReply>;

    /// Full URL for `path`, used in log and error messages
    fn url(&self, path: &str) -> String;
}

/// reqwest-backed transport talking plain HTTP to the charger
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(device: &DeviceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(device.request_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: device.base_url(),
        })
    }

    async fn read_reply(resp: reqwest::Response) -> Result<HttpReply> {
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Ok(HttpReply::status(status));
        }
        let body: Value = resp.json().await?;
        Ok(HttpReply { status, body })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn get_json(&self, path: &str, session_id: Option<&str>) -> Result<HttpReply> {
        let mut req = self
            .client
            .get(self.url(path))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("amtron-exporter/", env!("APP_VERSION")));
        if let Some(id) = session_id {
            req = req.header(AUTHORIZATION, id);
        }
        let resp = req.send().await?;
        Self::read_reply(resp).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<HttpReply> {
        let resp = self
            .client
            .post(self.url(path))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("amtron-exporter/", env!("APP_VERSION")))
            .json(body)
            .send()
            .await?;
        Self::read_reply(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
