// src/utils/logbook.rs
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::{fs, io::Write, path::PathBuf};

use crate::services::companies::CompanyId;

#[derive(Serialize)]
struct LogLine<'a> {
    ts: String,
    event: &'a str,
    company_id: CompanyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    period: Option<u32>,
    data: &'a Value,
}

/// Append-only JSONL record of successful writes (one line per event).
#[derive(Debug, Clone)]
pub struct Logbook {
    path: PathBuf,
    enabled: bool,
}

impl Logbook {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
        }
    }

    pub fn record(
        &self,
        event: &str,
        company_id: CompanyId,
        period: Option<u32>,
        data: &Value,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let line = LogLine {
            ts: Utc::now().to_rfc3339(),
            event,
            company_id,
            period,
            data,
        };
        let json = serde_json::to_string(&line)?;
        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{}", json)?;
        Ok(())
    }
}
