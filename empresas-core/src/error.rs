//! Error types for the persistence core.
//!
//! Absence of a document, section or statement is never an error; those
//! lookups return `Ok(None)` (or `0.0` for carry-forward values).

use thiserror::Error;

use crate::services::companies::CompanyId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Company name already exists: {0}")]
    DuplicateName(String),

    #[error("Company not found: {0}")]
    CompanyNotFound(CompanyId),

    #[error("Corrupt {table} payload for company {company_id}, period {period}: {detail}")]
    CorruptPayload {
        table: &'static str,
        company_id: CompanyId,
        period: u32,
        detail: String,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for failures of the backing store itself (I/O, SQLite, bad payloads),
    /// as opposed to caller mistakes the UI should re-prompt for.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StoreError::CorruptPayload { .. }
                | StoreError::Sqlite(_)
                | StoreError::Json(_)
                | StoreError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
