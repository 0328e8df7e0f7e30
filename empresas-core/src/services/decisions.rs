// src/services/decisions.rs
//! Decision store: one JSON document per (company, period), made of named
//! sections that each form owns.
//!
//! - A section write is read-merge-write inside one transaction; sibling
//!   sections are never dropped.
//! - Field keys pass through `field_key` and string values are coerced on
//!   write (numeric text becomes a number).
//! - A stored payload that is not an object of objects is reported as corrupt.

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::services::companies::CompanyId;
use crate::services::connection::{Database, is_foreign_key_violation};
use crate::utils::fields::{canonical_keys, coerce_section};

pub type Section = Map<String, Value>;
pub type DecisionDocument = Map<String, Value>;

/// Section names written by the decision forms.
pub mod sections {
    pub const CASH_FLOW: &str = "cash_flow_data";
    pub const PROJECTED_SALES: &str = "projected_sales_data";
    pub const SUMMARY: &str = "summary_data";
    pub const PREVIOUS_PERIOD: &str = "previous_period_data";
    pub const LOANS: &str = "loan_decisions";
    pub const ADVERTISING: &str = "advertising_decisions";
    pub const MARKET_RESEARCH: &str = "market_research";
    pub const RAW_MATERIAL_PRICES: &str = "raw_material_prices";
}

/// Result of a section lookup that keeps the two kinds of absence apart.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionLookup {
    Found(Section),
    NoDocument,
    MissingSection,
}

impl SectionLookup {
    pub fn into_option(self) -> Option<Section> {
        match self {
            SectionLookup::Found(s) => Some(s),
            SectionLookup::NoDocument | SectionLookup::MissingSection => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionStore {
    db: Database,
}

impl DecisionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn save_section(
        &self,
        company_id: CompanyId,
        period: u32,
        section: &str,
        data: Section,
    ) -> Result<()> {
        self.db.with_tx("save_section", |tx| {
            merge_section(tx, company_id, period, section, data)
        })?;
        tracing::info!(company_id, period, section, "decision section saved");
        Ok(())
    }

    pub fn load_section(
        &self,
        company_id: CompanyId,
        period: u32,
        section: &str,
    ) -> Result<Option<Section>> {
        Ok(self.lookup_section(company_id, period, section)?.into_option())
    }

    pub fn lookup_section(
        &self,
        company_id: CompanyId,
        period: u32,
        section: &str,
    ) -> Result<SectionLookup> {
        let doc = self.load_document(company_id, period)?;
        let Some(mut doc) = doc else {
            tracing::debug!(company_id, period, section, "no decision document");
            return Ok(SectionLookup::NoDocument);
        };
        match doc.remove(section) {
            Some(Value::Object(s)) => Ok(SectionLookup::Found(s)),
            Some(_) => {
                tracing::error!(op = "load_section", company_id, period, section, "section is not an object");
                Err(corrupt(
                    company_id,
                    period,
                    format!("section {section:?} is not an object"),
                ))
            }
            None => Ok(SectionLookup::MissingSection),
        }
    }

    /// The whole document, every section included.
    pub fn load_document(
        &self,
        company_id: CompanyId,
        period: u32,
    ) -> Result<Option<DecisionDocument>> {
        self.db.with_conn("load_decision_document", |conn| {
            read_document(conn, company_id, period)
        })
    }

    pub fn section_names(&self, company_id: CompanyId, period: u32) -> Result<Vec<String>> {
        Ok(self
            .load_document(company_id, period)?
            .map(|doc| doc.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Periods that have a decision document, ascending.
    pub fn periods(&self, company_id: CompanyId) -> Result<Vec<u32>> {
        self.db.with_conn("decision_periods", |conn| {
            let mut stmt =
                conn.prepare("SELECT period FROM decision WHERE company_id = ?1 ORDER BY period")?;
            let rows = stmt.query_map([company_id], |row| row.get::<_, u32>("period"))?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

/// Read-merge-write of one section on the caller's connection/transaction.
pub(crate) fn merge_section(
    conn: &Connection,
    company_id: CompanyId,
    period: u32,
    section: &str,
    data: Section,
) -> Result<()> {
    if section.trim().is_empty() {
        return Err(StoreError::Validation("section name is empty".into()));
    }
    let mut doc = read_document(conn, company_id, period)?.unwrap_or_default();
    doc.insert(
        section.to_string(),
        Value::Object(coerce_section(canonical_keys(data))),
    );
    let payload = serde_json::to_string(&doc)?;
    conn.execute(
        "INSERT INTO decision (company_id, period, payload) VALUES (?1, ?2, ?3)
         ON CONFLICT(company_id, period) DO UPDATE SET payload = excluded.payload",
        params![company_id, period, payload],
    )
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            StoreError::CompanyNotFound(company_id)
        } else {
            StoreError::from(e)
        }
    })?;
    Ok(())
}

pub(crate) fn read_document(
    conn: &Connection,
    company_id: CompanyId,
    period: u32,
) -> Result<Option<DecisionDocument>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM decision WHERE company_id = ?1 AND period = ?2",
            params![company_id, period],
            |row| row.get("payload"),
        )
        .optional()?;
    let Some(payload) = payload else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(&payload) {
        Ok(Value::Object(doc)) => Ok(Some(doc)),
        Ok(_) => Err(corrupt(company_id, period, "payload is not a JSON object".into())),
        Err(e) => Err(corrupt(company_id, period, e.to_string())),
    }
}

fn corrupt(company_id: CompanyId, period: u32, detail: String) -> StoreError {
    StoreError::CorruptPayload {
        table: "decision",
        company_id,
        period,
        detail,
    }
}
