//! Notifier collaborator. Delivery is best-effort for the orchestrator.

use std::path::{Path, PathBuf};

use serde::Serialize;

use backuper_core::config::ReportConfig;

use crate::error::ReportError;

/// Delivers a run report.
pub trait Notifier {
    fn send(&self, subject: &str, body: &str, attachments: &[PathBuf]) -> Result<(), ReportError>;
}

#[derive(Debug, Serialize)]
pub(crate) struct Attachment {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportPayload<'a> {
    pub subject: &'a str,
    pub body: &'a str,
    pub recipients: &'a [String],
    pub attachments: Vec<Attachment>,
}

pub(crate) fn read_attachments(paths: &[PathBuf]) -> Result<Vec<Attachment>, ReportError> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).map_err(|e| ReportError::Attachment {
                path: path.clone(),
                source: e,
            })?;
            Ok(Attachment {
                name: file_name(path),
                content: String::from_utf8_lossy(&bytes).into_owned(),
            })
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// JSON `POST` to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    recipients: Vec<String>,
}

impl WebhookNotifier {
    pub fn from_config(cfg: &ReportConfig) -> Self {
        Self {
            url: cfg.webhook.clone(),
            recipients: cfg.recipients.clone(),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, subject: &str, body: &str, attachments: &[PathBuf]) -> Result<(), ReportError> {
        let payload = ReportPayload {
            subject,
            body,
            recipients: &self.recipients,
            attachments: read_attachments(attachments)?,
        };
        let value = serde_json::to_value(&payload).map_err(|e| ReportError::Delivery {
            url: self.url.clone(),
            message: e.to_string(),
        })?;
        ureq::post(&self.url)
            .send_json(value)
            .map_err(|e| ReportError::Delivery {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        tracing::info!(url = %self.url, subject, "report delivered");
        Ok(())
    }
}

/// Emits the report through `tracing` when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, subject: &str, body: &str, attachments: &[PathBuf]) -> Result<(), ReportError> {
        let names: Vec<String> = attachments.iter().map(|p| file_name(p)).collect();
        tracing::info!(
            subject,
            lines = body.lines().count(),
            attachments = %names.join(", "),
            "report (no webhook configured)"
        );
        Ok(())
    }
}
