// src/services/carry_forward.rs
//! Period carry-forward resolver. Read-only: nothing here writes back.
//!
//! - Opening cash for P comes from P's own `BALANCE_SHEET`.
//! - "Stock Período Anterior" for P comes from the `summary_data` section of
//!   P's own decision document. The summary form stores, under period P, the
//!   stock that was previous to P when it was entered, so the lookup is P and
//!   not P-1.
//! - Finished goods reported in `previous_period_data` are read from P-1.
//!
//! Every absence resolves to `0.0`; only storage failures are errors.

use serde::Serialize;

use crate::config::CarryForwardConfig;
use crate::error::Result;
use crate::services::companies::CompanyId;
use crate::services::decisions::{DecisionStore, Section, sections};
use crate::services::statements::{StatementStore, StatementType};
use crate::utils::fields::{as_number, field_key};

/// Balance-sheet field holding available cash. Written by the balance form
/// with this exact casing.
pub const OPENING_CASH_FIELD: &str = "activo_circulante_Disponible";

const STOCK_LABEL: &str = "Stock Período Anterior";
const FINISHED_GOODS_LABEL: &str = "Productos Terminados";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockEntry {
    pub product_line: String,
    pub country: String,
    pub key: String,
    pub units: f64,
}

/// One value per product line × country, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StockCarryForward {
    pub period: u32,
    pub entries: Vec<StockEntry>,
}

impl StockCarryForward {
    pub fn get(&self, product_line: &str, country: &str) -> f64 {
        self.entries
            .iter()
            .find(|e| e.product_line == product_line && e.country == country)
            .map(|e| e.units)
            .unwrap_or(0.0)
    }

    pub fn total_for(&self, product_line: &str) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.product_line == product_line)
            .map(|e| e.units)
            .sum()
    }
}

/// `home` + `Argentina` -> `home_stock_periodo_anterior_argentina`.
pub fn stock_field_key(product_line: &str, country: &str) -> String {
    field_key(&format!("{product_line} {STOCK_LABEL} {country}"))
}

/// `pro` + `Brasil` -> `pro_productos_terminados_brasil`.
pub fn finished_goods_field_key(product_line: &str, country: &str) -> String {
    field_key(&format!("{product_line} {FINISHED_GOODS_LABEL} {country}"))
}

#[derive(Debug, Clone)]
pub struct CarryForward {
    decisions: DecisionStore,
    statements: StatementStore,
    grid: CarryForwardConfig,
}

impl CarryForward {
    pub fn new(decisions: DecisionStore, statements: StatementStore, grid: CarryForwardConfig) -> Self {
        Self {
            decisions,
            statements,
            grid,
        }
    }

    pub fn opening_balance(&self, company_id: CompanyId, period: u32) -> Result<f64> {
        let sheet = self
            .statements
            .load_statement(company_id, period, &StatementType::BalanceSheet)?;
        let value = sheet
            .as_ref()
            .and_then(|s| s.get(OPENING_CASH_FIELD))
            .and_then(as_number)
            .unwrap_or(0.0);
        tracing::debug!(company_id, period, value, "opening balance resolved");
        Ok(value)
    }

    pub fn prior_period_stock(&self, company_id: CompanyId, period: u32) -> Result<StockCarryForward> {
        let summary = self
            .decisions
            .load_section(company_id, period, sections::SUMMARY)?;
        Ok(self.read_grid(period, summary.as_ref(), stock_field_key))
    }

    pub fn previous_period_finished_goods(
        &self,
        company_id: CompanyId,
        period: u32,
    ) -> Result<StockCarryForward> {
        let source = match period.checked_sub(1) {
            Some(prev) => self
                .decisions
                .load_section(company_id, prev, sections::PREVIOUS_PERIOD)?,
            None => None,
        };
        Ok(self.read_grid(period, source.as_ref(), finished_goods_field_key))
    }

    fn read_grid(
        &self,
        period: u32,
        source: Option<&Section>,
        key_for: fn(&str, &str) -> String,
    ) -> StockCarryForward {
        let mut entries = Vec::with_capacity(self.grid.product_lines.len() * self.grid.countries.len());
        for line in &self.grid.product_lines {
            for country in &self.grid.countries {
                let key = key_for(line, country);
                let units = source
                    .and_then(|s| s.get(&key))
                    .and_then(as_number)
                    .unwrap_or(0.0);
                entries.push(StockEntry {
                    product_line: line.clone(),
                    country: country.clone(),
                    key,
                    units,
                });
            }
        }
        StockCarryForward { period, entries }
    }
}
