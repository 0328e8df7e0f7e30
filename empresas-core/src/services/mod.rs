// src/services/mod.rs

pub mod carry_forward; // read-only derivations across periods/statements
pub mod companies;
pub mod connection;    // one scoped SQLite connection per operation
pub mod decisions;     // (company, period) documents, merged per section
pub mod schema;
pub mod statements;    // (company, period, type) documents, replaced on save

// Public API
pub use carry_forward::{CarryForward, StockCarryForward, StockEntry};
pub use companies::{Company, CompanyId, CompanyRegistry};
pub use connection::Database;
pub use decisions::{DecisionStore, Section, SectionLookup};
pub use schema::{SchemaReport, ensure_schema};
pub use statements::{Statement, StatementStore, StatementType};
