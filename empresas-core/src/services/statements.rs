// src/services/statements.rs
//! Financial statement store: one flat JSON document per
//! (company, period, statement type), replaced wholesale on save.

use rusqlite::{OptionalExtension, params};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};
use crate::services::companies::CompanyId;
use crate::services::connection::{Database, is_foreign_key_violation};

pub type Statement = Map<String, Value>;

const SALES_PREFIX: &str = "SALES_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementType {
    BalanceSheet,
    BalanceFinal,
    SystemControl,
    PhysicalInventory,
    IncomeStatementInventory,
    AdditionalBalanceInfo,
    ModelHome,
    ModelProfessional,
    PaidSalesHome,
    PaidSalesProfessional,
    Observations,
    /// Per-model sales by country, stored as `SALES_<MODEL>`.
    Sales(String),
    Other(String),
}

impl StatementType {
    pub fn sales(model: &str) -> Self {
        StatementType::Sales(model.trim().to_uppercase())
    }

    pub fn other(name: &str) -> Self {
        StatementType::Other(name.trim().to_uppercase())
    }

    fn known_name(&self) -> Option<&'static str> {
        let name = match self {
            StatementType::BalanceSheet => "BALANCE_SHEET",
            StatementType::BalanceFinal => "BALANCE_FINAL",
            StatementType::SystemControl => "CONTROL_SISTEMA",
            StatementType::PhysicalInventory => "PHYSICAL_INVENTORY",
            StatementType::IncomeStatementInventory => "DATOS_FISICOS_INVENTARIO",
            StatementType::AdditionalBalanceInfo => "ADDITIONAL_BALANCE_INFO",
            StatementType::ModelHome => "MODELO_HOME",
            StatementType::ModelProfessional => "MODELO_PROFESSIONAL",
            StatementType::PaidSalesHome => "VENTAS_PAGADAS_HOME",
            StatementType::PaidSalesProfessional => "VENTAS_PAGADAS_PROFESSIONAL",
            StatementType::Observations => "LISTADO_OBSERVACIONES",
            StatementType::Sales(_) | StatementType::Other(_) => return None,
        };
        Some(name)
    }

    /// The string stored in the `type` column. Always upper case, so that
    /// whatever `statement_types` lists can be loaded back.
    pub fn stored_name(&self) -> String {
        match self {
            StatementType::Sales(model) => format!("{SALES_PREFIX}{}", model.trim().to_uppercase()),
            StatementType::Other(name) => name.trim().to_uppercase(),
            known => known.known_name().map(str::to_string).unwrap_or_default(),
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stored_name())
    }
}

impl FromStr for StatementType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_uppercase();
        if s.is_empty() {
            return Err(StoreError::Validation("statement type is empty".into()));
        }
        let known = [
            StatementType::BalanceSheet,
            StatementType::BalanceFinal,
            StatementType::SystemControl,
            StatementType::PhysicalInventory,
            StatementType::IncomeStatementInventory,
            StatementType::AdditionalBalanceInfo,
            StatementType::ModelHome,
            StatementType::ModelProfessional,
            StatementType::PaidSalesHome,
            StatementType::PaidSalesProfessional,
            StatementType::Observations,
        ];
        if let Some(t) = known.into_iter().find(|t| t.known_name() == Some(s.as_str())) {
            return Ok(t);
        }
        if let Some(model) = s.strip_prefix(SALES_PREFIX).filter(|m| !m.is_empty()) {
            return Ok(StatementType::sales(model));
        }
        Ok(StatementType::other(&s))
    }
}

impl Serialize for StatementType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.stored_name())
    }
}

#[derive(Debug, Clone)]
pub struct StatementStore {
    db: Database,
}

impl StatementStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Replace the statement for the key; prior content of the same type is discarded.
    pub fn save_statement(
        &self,
        company_id: CompanyId,
        period: u32,
        statement_type: &StatementType,
        data: Statement,
    ) -> Result<()> {
        if let Some((field, _)) = data.iter().find(|(_, v)| v.is_array() || v.is_object()) {
            return Err(StoreError::Validation(format!(
                "statement field {field:?} must be a number, string or null"
            )));
        }
        let kind = statement_type.stored_name();
        if kind.is_empty() || kind == SALES_PREFIX {
            return Err(StoreError::Validation("statement type is empty".into()));
        }
        let body = serde_json::to_string(&data)?;
        self.db.with_tx("save_statement", |tx| {
            tx.execute(
                "INSERT INTO financial_statement (company_id, period, type, data)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(company_id, period, type) DO UPDATE SET data = excluded.data",
                params![company_id, period, kind, body],
            )
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::CompanyNotFound(company_id)
                } else {
                    StoreError::from(e)
                }
            })?;
            Ok(())
        })?;
        tracing::info!(company_id, period, statement = %kind, "financial statement saved");
        Ok(())
    }

    pub fn load_statement(
        &self,
        company_id: CompanyId,
        period: u32,
        statement_type: &StatementType,
    ) -> Result<Option<Statement>> {
        let kind = statement_type.stored_name();
        self.db.with_conn("load_statement", |conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT data FROM financial_statement
                     WHERE company_id = ?1 AND period = ?2 AND type = ?3",
                    params![company_id, period, kind],
                    |row| row.get("data"),
                )
                .optional()?;
            let Some(body) = body else {
                tracing::debug!(company_id, period, statement = %kind, "no statement");
                return Ok(None);
            };
            match serde_json::from_str::<Value>(&body) {
                Ok(Value::Object(data)) => Ok(Some(data)),
                Ok(_) => Err(corrupt(company_id, period, format!("{kind} is not a JSON object"))),
                Err(e) => Err(corrupt(company_id, period, format!("{kind}: {e}"))),
            }
        })
    }

    /// Statement types stored for (company, period), sorted by stored name.
    pub fn statement_types(&self, company_id: CompanyId, period: u32) -> Result<Vec<StatementType>> {
        let names = self.db.with_conn("statement_types", |conn| {
            let mut stmt = conn.prepare(
                "SELECT type FROM financial_statement
                 WHERE company_id = ?1 AND period = ?2 ORDER BY type",
            )?;
            let rows = stmt.query_map(params![company_id, period], |row| {
                row.get::<_, String>("type")
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        names.iter().map(|n| n.parse()).collect()
    }
}

fn corrupt(company_id: CompanyId, period: u32, detail: String) -> StoreError {
    StoreError::CorruptPayload {
        table: "financial_statement",
        company_id,
        period,
        detail,
    }
}
