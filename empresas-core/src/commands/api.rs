// src/commands/api.rs
use anyhow::Result as AnyResult;
use serde_json::{Value, json};
use std::path::Path;

use crate::commands::init::{ensure_initialized, ensure_initialized_once, open_database};
use crate::config::CoreConfig;
use crate::error::Result;
use crate::services::carry_forward::{CarryForward, StockCarryForward};
use crate::services::companies::{Company, CompanyId, CompanyRegistry, bump_period};
use crate::services::connection::Database;
use crate::services::decisions::{
    DecisionDocument, DecisionStore, Section, SectionLookup, merge_section,
};
use crate::services::statements::{Statement, StatementStore, StatementType};
use crate::utils::logbook::Logbook;

/// Everything a form needs, behind one handle.
pub struct Commands {
    config: CoreConfig,
    db: Database,
    companies: CompanyRegistry,
    decisions: DecisionStore,
    statements: StatementStore,
    carry: CarryForward,
    logbook: Logbook,
}

impl Commands {
    /// Initialize `root` (config, logbook dir, schema) and open it.
    pub fn open(root: &Path) -> AnyResult<Self> {
        let report = ensure_initialized(root)?;
        Ok(Self::from_config(report.config))
    }

    /// Open the process-wide data root (see `init::default_root`).
    pub fn open_default() -> AnyResult<Self> {
        let report = ensure_initialized_once()?;
        Ok(Self::from_config(report.config.clone()))
    }

    /// Build from an already-resolved config. The schema is assumed to exist.
    pub fn from_config(config: CoreConfig) -> Self {
        let db = open_database(&config);
        let decisions = DecisionStore::new(db.clone());
        let statements = StatementStore::new(db.clone());
        let carry = CarryForward::new(
            decisions.clone(),
            statements.clone(),
            config.carry_forward.clone(),
        );
        Self {
            companies: CompanyRegistry::new(db.clone(), config.company.clone()),
            logbook: Logbook::new(&config.logbook.path, config.logbook.enabled),
            config,
            db,
            decisions,
            statements,
            carry,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // ---------- companies ----------

    pub fn create_company(&self, name: &str) -> Result<CompanyId> {
        let id = self.companies.create_company(name)?;
        self.note("company_created", id, None, json!({ "name": name.trim() }));
        Ok(id)
    }

    pub fn get_companies(&self) -> Result<Vec<(CompanyId, String)>> {
        self.companies.get_companies()
    }

    pub fn get_company_info(&self, id: CompanyId) -> Result<Option<Company>> {
        self.companies.get_company_info(id)
    }

    pub fn get_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        self.companies.get_company_by_name(name)
    }

    pub fn increment_period(&self, id: CompanyId) -> Result<()> {
        self.companies.increment_period(id)?;
        self.note("period_incremented", id, None, Value::Null);
        Ok(())
    }

    pub fn set_cash(&self, id: CompanyId, cash_usd: f64) -> Result<()> {
        self.companies.set_cash(id, cash_usd)?;
        self.note("cash_set", id, None, json!({ "cash_usd": cash_usd }));
        Ok(())
    }

    pub fn set_exchange_rate(&self, id: CompanyId, rate: f64) -> Result<()> {
        self.companies.set_exchange_rate(id, rate)?;
        self.note("exchange_rate_set", id, None, json!({ "rate": rate }));
        Ok(())
    }

    // ---------- decision sections ----------

    pub fn save_section(
        &self,
        company_id: CompanyId,
        period: u32,
        section: &str,
        data: Section,
    ) -> Result<()> {
        let fields = data.len();
        self.decisions.save_section(company_id, period, section, data)?;
        self.note(
            "section_saved",
            company_id,
            Some(period),
            json!({ "section": section, "fields": fields }),
        );
        Ok(())
    }

    pub fn load_section(
        &self,
        company_id: CompanyId,
        period: u32,
        section: &str,
    ) -> Result<Option<Section>> {
        self.decisions.load_section(company_id, period, section)
    }

    pub fn lookup_section(
        &self,
        company_id: CompanyId,
        period: u32,
        section: &str,
    ) -> Result<SectionLookup> {
        self.decisions.lookup_section(company_id, period, section)
    }

    pub fn load_document(
        &self,
        company_id: CompanyId,
        period: u32,
    ) -> Result<Option<DecisionDocument>> {
        self.decisions.load_document(company_id, period)
    }

    pub fn decision_periods(&self, company_id: CompanyId) -> Result<Vec<u32>> {
        self.decisions.periods(company_id)
    }

    /// Save a section and advance the company's period in one transaction.
    /// Either both happen or neither does.
    pub fn commit_section(
        &self,
        company_id: CompanyId,
        period: u32,
        section: &str,
        data: Section,
    ) -> Result<()> {
        let fields = data.len();
        self.db.with_tx("commit_section", |tx| {
            merge_section(tx, company_id, period, section, data)?;
            bump_period(tx, company_id)
        })?;
        tracing::info!(company_id, period, section, "decisions committed");
        self.note(
            "section_committed",
            company_id,
            Some(period),
            json!({ "section": section, "fields": fields }),
        );
        Ok(())
    }

    // ---------- financial statements ----------

    pub fn save_statement(
        &self,
        company_id: CompanyId,
        period: u32,
        statement_type: &StatementType,
        data: Statement,
    ) -> Result<()> {
        let fields = data.len();
        self.statements
            .save_statement(company_id, period, statement_type, data)?;
        self.note(
            "statement_saved",
            company_id,
            Some(period),
            json!({ "type": statement_type.stored_name(), "fields": fields }),
        );
        Ok(())
    }

    pub fn load_statement(
        &self,
        company_id: CompanyId,
        period: u32,
        statement_type: &StatementType,
    ) -> Result<Option<Statement>> {
        self.statements
            .load_statement(company_id, period, statement_type)
    }

    pub fn statement_types(&self, company_id: CompanyId, period: u32) -> Result<Vec<StatementType>> {
        self.statements.statement_types(company_id, period)
    }

    // ---------- carry-forward ----------

    pub fn opening_balance(&self, company_id: CompanyId, period: u32) -> Result<f64> {
        self.carry.opening_balance(company_id, period)
    }

    pub fn prior_period_stock(&self, company_id: CompanyId, period: u32) -> Result<StockCarryForward> {
        self.carry.prior_period_stock(company_id, period)
    }

    pub fn previous_period_finished_goods(
        &self,
        company_id: CompanyId,
        period: u32,
    ) -> Result<StockCarryForward> {
        self.carry.previous_period_finished_goods(company_id, period)
    }

    /// The store write already committed; a logbook failure only degrades the audit trail.
    fn note(&self, event: &str, company_id: CompanyId, period: Option<u32>, data: Value) {
        if let Err(e) = self.logbook.record(event, company_id, period, &data) {
            tracing::warn!(event, company_id, error = %e, "logbook append failed");
        }
    }
}
