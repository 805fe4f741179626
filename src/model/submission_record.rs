use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// The application as sent to B12. Built once per run and signed as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub timestamp: String,
    pub name: String,
    pub email: String,
    pub resume_link: String,
    pub repository_link: String,
    pub action_run_link: String,
}

impl SubmissionRecord {
    pub fn new(settings: &Settings, timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            name: settings.name.clone(),
            email: settings.email.clone(),
            resume_link: settings.resume_link.clone(),
            repository_link: settings.repository_link.clone(),
            action_run_link: settings.action_run_link(),
        }
    }

    /// Current UTC time, e.g. `2026-02-09T16:59:37.571Z`
    pub fn timestamp_now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Compact JSON with keys in byte order. These bytes are both the request body
    /// and the HMAC message, so the server must be able to reproduce them exactly.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let fields = BTreeMap::from([
            ("action_run_link", self.action_run_link.as_str()),
            ("email", self.email.as_str()),
            ("name", self.name.as_str()),
            ("repository_link", self.repository_link.as_str()),
            ("resume_link", self.resume_link.as_str()),
            ("timestamp", self.timestamp.as_str()),
        ]);
        serde_json::to_vec(&fields)
    }
}
