//! Period-keyed persistence for the Juego de Empresas simulation.
//!
//! Companies advance turn by turn. Each (company, period) owns one decision
//! document split into named sections, plus any number of financial statements
//! keyed by type. Forms read and write through [`commands::Commands`].

pub mod commands;
pub mod config;
pub mod error;
pub mod services;
pub mod utils;

pub use commands::Commands;
pub use config::CoreConfig;
pub use error::{Result, StoreError};
pub use services::{
    Company, CompanyId, Section, SectionLookup, Statement, StatementType, StockCarryForward,
};
pub use utils::{FormFields, field_key};
