// src/services/schema.rs
//! Schema initializer.
//!
//! Creates `company`, `decision` and `financial_statement` if absent. The old
//! `system_control` table held the same (company, period, type) documents as
//! `financial_statement`; when it is present its rows are folded into
//! `financial_statement` and the legacy table is left as it was.
//!
//! Decision sections written before keys were normalized (for example
//! `home_Stock_Período_Anterior_Argentina`) are re-keyed through `field_key`
//! so readers only ever look up canonical keys.

use rusqlite::{Connection, params};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::services::connection::Database;
use crate::utils::fields::{canonical_keys, has_legacy_keys};

pub const TABLES: [&str; 3] = ["company", "decision", "financial_statement"];

const LEGACY_STATEMENT_TABLE: &str = "system_control";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS company (
  id                               INTEGER PRIMARY KEY AUTOINCREMENT,
  name                             TEXT NOT NULL UNIQUE,
  cash_usd                         REAL NOT NULL DEFAULT 0.0,
  current_period                   INTEGER NOT NULL DEFAULT 0,
  reporting_currency_exchange_rate REAL NOT NULL DEFAULT 950.0
);

-- One JSON object of named sections per (company, period).
CREATE TABLE IF NOT EXISTS decision (
  company_id  INTEGER NOT NULL,
  period      INTEGER NOT NULL,
  payload     TEXT NOT NULL,
  PRIMARY KEY (company_id, period),
  FOREIGN KEY (company_id) REFERENCES company(id)
);

-- One flat JSON object per (company, period, statement type).
CREATE TABLE IF NOT EXISTS financial_statement (
  company_id  INTEGER NOT NULL,
  period      INTEGER NOT NULL,
  type        TEXT NOT NULL,
  data        TEXT NOT NULL,
  PRIMARY KEY (company_id, period, type),
  FOREIGN KEY (company_id) REFERENCES company(id)
);
"#;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaReport {
    pub created: Vec<String>,
    pub existed: Vec<String>,
    /// Rows copied from the legacy `system_control` table on this run.
    pub migrated_legacy_rows: usize,
    /// Decision documents whose section keys were rewritten on this run.
    pub rekeyed_decision_rows: usize,
}

/// Idempotent: safe to call on every start-up and from every entry point.
pub fn ensure_schema(db: &Database) -> Result<SchemaReport> {
    db.with_tx("ensure_schema", |tx| {
        let mut report = SchemaReport::default();
        for table in TABLES {
            if table_exists(tx, table)? {
                report.existed.push(table.to_string());
            } else {
                report.created.push(table.to_string());
            }
        }

        tx.execute_batch(SCHEMA_SQL)?;

        if table_exists(tx, LEGACY_STATEMENT_TABLE)? {
            // Orphan rows would trip the foreign key, so only known companies move.
            report.migrated_legacy_rows = tx.execute(
                "INSERT OR IGNORE INTO financial_statement (company_id, period, type, data)
                 SELECT s.company_id, s.period, s.type, s.data
                 FROM system_control s
                 WHERE s.company_id IN (SELECT id FROM company)",
                [],
            )?;
            if report.migrated_legacy_rows > 0 {
                tracing::info!(
                    rows = report.migrated_legacy_rows,
                    "folded legacy system_control rows into financial_statement"
                );
            }
        }

        report.rekeyed_decision_rows = rekey_decision_sections(tx)?;
        if report.rekeyed_decision_rows > 0 {
            tracing::info!(
                rows = report.rekeyed_decision_rows,
                "re-keyed legacy decision sections"
            );
        }

        if !report.created.is_empty() {
            tracing::info!(created = ?report.created, "schema initialized");
        }
        Ok(report)
    })
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

/// Rewrite legacy field keys in every decision section. Payloads that do not
/// parse are left for the readers to report as corrupt.
fn rekey_decision_sections(conn: &Connection) -> Result<usize> {
    let rows = {
        let mut stmt = conn.prepare("SELECT company_id, period, payload FROM decision")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>("company_id")?,
                row.get::<_, u32>("period")?,
                row.get::<_, String>("payload")?,
            ))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut rewritten = 0;
    for (company_id, period, payload) in rows {
        let Ok(Value::Object(mut doc)) = serde_json::from_str::<Value>(&payload) else {
            continue;
        };
        let mut changed = false;
        for section in doc.values_mut() {
            if let Value::Object(fields) = section {
                if has_legacy_keys(fields) {
                    *fields = canonical_keys(std::mem::take(fields));
                    changed = true;
                }
            }
        }
        if !changed {
            continue;
        }
        conn.execute(
            "UPDATE decision SET payload = ?1 WHERE company_id = ?2 AND period = ?3",
            params![serde_json::to_string(&doc)?, company_id, period],
        )?;
        rewritten += 1;
    }
    Ok(rewritten)
}
