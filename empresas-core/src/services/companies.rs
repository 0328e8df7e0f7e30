// src/services/companies.rs
//! Company registry: creation, lookup, and turn progression.
//!
//! - Names are trimmed, 3–50 chars, alphanumeric or whitespace only, unique.
//! - `current_period` only moves forward, one step per `increment_period`.

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::config::CompanyConfig;
use crate::error::{Result, StoreError};
use crate::services::connection::{Database, is_unique_violation};

pub type CompanyId = i64;

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub cash_usd: f64,
    pub current_period: u32,
    pub reporting_currency_exchange_rate: f64,
}

impl Company {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            cash_usd: row.get("cash_usd")?,
            current_period: row.get("current_period")?,
            reporting_currency_exchange_rate: row.get("reporting_currency_exchange_rate")?,
        })
    }
}

const COMPANY_COLUMNS: &str =
    "id, name, cash_usd, current_period, reporting_currency_exchange_rate";

/// Validate a company name and return it trimmed.
pub fn validate_company_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("company name is empty".into()));
    }
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(StoreError::Validation(format!(
            "company name must have at least {NAME_MIN_CHARS} characters"
        )));
    }
    if len > NAME_MAX_CHARS {
        return Err(StoreError::Validation(format!(
            "company name must have at most {NAME_MAX_CHARS} characters"
        )));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c.is_whitespace()) {
        return Err(StoreError::Validation(
            "company name may only contain letters, digits and spaces".into(),
        ));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone)]
pub struct CompanyRegistry {
    db: Database,
    seed: CompanyConfig,
}

impl CompanyRegistry {
    pub fn new(db: Database, seed: CompanyConfig) -> Self {
        Self { db, seed }
    }

    pub fn create_company(&self, name: &str) -> Result<CompanyId> {
        let name = validate_company_name(name)?;
        let id = self.db.with_tx("create_company", |tx| {
            tx.execute(
                "INSERT INTO company (name, cash_usd, current_period, reporting_currency_exchange_rate)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    name,
                    self.seed.starting_cash_usd,
                    self.seed.starting_period,
                    self.seed.exchange_rate
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateName(name.clone())
                } else {
                    StoreError::from(e)
                }
            })?;
            Ok(tx.last_insert_rowid())
        })?;
        tracing::info!(company_id = id, name = %name, "company created");
        Ok(id)
    }

    /// `(id, name)` pairs ordered by name.
    pub fn get_companies(&self) -> Result<Vec<(CompanyId, String)>> {
        self.db.with_conn("get_companies", |conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM company ORDER BY name")?;
            let rows = stmt.query_map([], |row| Ok((row.get("id")?, row.get("name")?)))?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn get_company_info(&self, id: CompanyId) -> Result<Option<Company>> {
        self.db
            .with_conn("get_company_info", |conn| Ok(company_by_id(conn, id)?))
    }

    pub fn get_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        let name = name.trim();
        self.db.with_conn("get_company_by_name", |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {COMPANY_COLUMNS} FROM company WHERE name = ?1"),
                    [name],
                    Company::from_row,
                )
                .optional()?)
        })
    }

    /// Advance the company one period.
    pub fn increment_period(&self, id: CompanyId) -> Result<()> {
        self.db
            .with_tx("increment_period", |tx| bump_period(tx, id))?;
        tracing::info!(company_id = id, "period advanced");
        Ok(())
    }

    pub fn set_cash(&self, id: CompanyId, cash_usd: f64) -> Result<()> {
        if !cash_usd.is_finite() {
            return Err(StoreError::Validation("cash balance must be a finite number".into()));
        }
        self.update_column("set_cash", id, "cash_usd", cash_usd)
    }

    pub fn set_exchange_rate(&self, id: CompanyId, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(StoreError::Validation(
                "exchange rate must be a positive number".into(),
            ));
        }
        self.update_column("set_exchange_rate", id, "reporting_currency_exchange_rate", rate)
    }

    fn update_column(
        &self,
        op: &'static str,
        id: CompanyId,
        column: &'static str,
        value: f64,
    ) -> Result<()> {
        self.db.with_tx(op, |tx| {
            let n = tx.execute(
                &format!("UPDATE company SET {column} = ?1 WHERE id = ?2"),
                params![value, id],
            )?;
            if n == 0 {
                return Err(StoreError::CompanyNotFound(id));
            }
            Ok(())
        })
    }
}

pub(crate) fn company_by_id(conn: &Connection, id: CompanyId) -> rusqlite::Result<Option<Company>> {
    conn.query_row(
        &format!("SELECT {COMPANY_COLUMNS} FROM company WHERE id = ?1"),
        [id],
        Company::from_row,
    )
    .optional()
}

/// `current_period + 1` in place; shared with the commit path so both run in
/// the caller's transaction.
pub(crate) fn bump_period(conn: &Connection, id: CompanyId) -> Result<()> {
    let n = conn.execute(
        "UPDATE company SET current_period = current_period + 1 WHERE id = ?1",
        [id],
    )?;
    if n == 0 {
        return Err(StoreError::CompanyNotFound(id));
    }
    Ok(())
}
