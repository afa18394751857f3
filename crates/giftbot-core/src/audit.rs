use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
};

use chrono::Utc;
use serde::Serialize;

use crate::{errors::Error, Result};

const AUDIT_MAX_TEXT: usize = 500;

/// RFC3339 timestamp in UTC.
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub user_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    fn base(event: &str, user_id: i64) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id,
            recipient: None,
            budget: None,
            source: None,
            content: None,
            reason: None,
        }
    }

    pub fn flow_start(user_id: i64) -> Self {
        Self::base("flow_start", user_id)
    }

    pub fn recipient(user_id: i64, recipient: &str) -> Self {
        Self {
            recipient: Some(recipient.to_string()),
            ..Self::base("recipient", user_id)
        }
    }

    pub fn suggestion(
        user_id: i64,
        recipient: &str,
        budget: &str,
        source: &str,
        text: &str,
    ) -> Self {
        Self {
            recipient: Some(recipient.to_string()),
            budget: Some(budget.to_string()),
            source: Some(source.to_string()),
            content: Some(text.to_string()),
            ..Self::base("suggestion", user_id)
        }
    }

    pub fn rejected(user_id: i64, payload: &str, reason: &str) -> Self {
        Self {
            content: Some(payload.to_string()),
            reason: Some(reason.to_string()),
            ..Self::base("rejected", user_id)
        }
    }

    pub fn cancel(user_id: i64) -> Self {
        Self::base("cancel", user_id)
    }
}

/// Append-only audit file, plain text blocks or JSON lines.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.recipient {
            event.recipient = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            match v {
                serde_json::Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Write and log instead of failing; audit problems never block a reply.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(event) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write audit event");
        }
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    format!("{}...", s.chars().take(max_len).collect::<String>())
}
