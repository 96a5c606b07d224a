//! Delivery of the end-of-run message to push services.
//!
//! Failures to deliver are logged and never fail the run.

use crate::config::PushConfig;
use crate::error::{BeanstalkError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

pub const TITLE: &str = "beanstalk tasks";

const PUSHPLUS_URL: &str = "http://www.pushplus.plus/send";
const SERVERCHAN_URL: &str = "https://sc.ftqq.com";

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, title: &str, message: &str) -> Result<()>;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .unwrap_or_default()
}

fn check_status(sink: &str, resp: &reqwest::Response) -> Result<()> {
    let status = resp.status();
    tracing::info!(sink, %status, "push delivered");
    if status.is_success() {
        Ok(())
    } else {
        Err(BeanstalkError::Remote(format!("{sink} answered {status}")))
    }
}

// ---------------------------------------------------------------------------
// PushPlus
// ---------------------------------------------------------------------------

/// Form-encoded POST of `token`, `title`, `content`.
pub struct PushPlus {
    token: String,
    url: String,
    http: reqwest::Client,
}

impl PushPlus {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: PUSHPLUS_URL.to_string(),
            http: http_client(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl NotificationSink for PushPlus {
    fn name(&self) -> &'static str {
        "pushplus"
    }

    async fn send(&self, title: &str, message: &str) -> Result<()> {
        let form = [
            ("token", self.token.as_str()),
            ("title", title),
            ("content", message),
        ];
        let resp = self.http.post(&self.url).form(&form).send().await?;
        check_status(self.name(), &resp)
    }
}

// ---------------------------------------------------------------------------
// ServerChan
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ServerChanMessage<'a> {
    title: &'a str,
    desp: String,
}

/// JSON POST of `{title, desp}` to `<base>/<key>.send`. The service renders
/// Markdown, so single newlines are doubled.
pub struct ServerChan {
    key: String,
    base_url: String,
    http: reqwest::Client,
}

impl ServerChan {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_url: SERVERCHAN_URL.to_string(),
            http: http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl NotificationSink for ServerChan {
    fn name(&self) -> &'static str {
        "serverchan"
    }

    async fn send(&self, title: &str, message: &str) -> Result<()> {
        let url = format!("{}/{}.send", self.base_url.trim_end_matches('/'), self.key);
        let body = ServerChanMessage {
            title,
            desp: message.replace('\n', "\n\n"),
        };
        let resp = self.http.post(url).json(&body).send().await?;
        check_status(self.name(), &resp)
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Fans a message out to every configured sink.
#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(push: &PushConfig) -> Self {
        let mut notifier = Self::new();
        if let Some(token) = push.pushplus_token.as_deref().filter(|t| !t.is_empty()) {
            notifier.add(Box::new(PushPlus::new(token)));
        }
        if let Some(key) = push.serverchan_key.as_deref().filter(|k| !k.is_empty()) {
            notifier.add(Box::new(ServerChan::new(key)));
        }
        notifier
    }

    pub fn add(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl NotificationSink for Notifier {
    fn name(&self) -> &'static str {
        "notifier"
    }

    /// Never fails; each sink's error is logged.
    async fn send(&self, title: &str, message: &str) -> Result<()> {
        if self.sinks.is_empty() {
            tracing::debug!("no push sinks configured");
        }
        for sink in &self.sinks {
            if let Err(e) = sink.send(title, message).await {
                tracing::warn!(sink = sink.name(), error = %e, "push failed");
            }
        }
        Ok(())
    }
}
