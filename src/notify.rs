//! Delivery of the end-of-run report.

use log::{error, info, warn};
use reqwest::blocking::Client;
use serde_json::json;

use crate::error::{Error, Result};
use crate::report::RunReport;

/// Something that accepts a subject and a body.
pub trait Notifier {
    fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Writes notifications to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<()> {
        info!(target: "notify", "{}\n{}", subject, body);
        Ok(())
    }
}

/// POSTs `{"text": "<subject>\n\n<body>"}` to a chat webhook.
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self> {
        url::Url::parse(url)?;
        Ok(Self {
            http: Client::new(),
            url: url.to_string(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<()> {
        let payload = json!({ "text": format!("{}\n\n{}", subject, body) });
        let response = self.http.post(&self.url).json(&payload).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                url: self.url.clone(),
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// The webhook notifier when a URL is configured, otherwise the log.
pub fn from_settings(webhook_url: Option<&str>) -> Result<Box<dyn Notifier>> {
    match webhook_url {
        Some(url) => Ok(Box::new(WebhookNotifier::new(url)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}

/// Sends every notification of `report`. Delivery failures are logged.
pub fn deliver(notifier: &dyn Notifier, report: &RunReport) {
    if report.has_failures() {
        warn!(target: "notify", "run finished with {} errors", report.failures.len());
    }
    for notification in report.notifications() {
        if let Err(e) = notifier.send(&notification.subject, &notification.body) {
            error!(target: "notify", "could not send \"{}\": {}", notification.subject, e);
        }
    }
}
