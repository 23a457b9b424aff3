use crate::models::MonthParseError;
use service_core::error::AppError;
use sqlx::postgres::PgDatabaseError;
use std::fmt;
use thiserror::Error;

/// Diagnostic reported by the relational backend for a failed statement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreDiagnostic {
    pub message: String,
    pub code: Option<String>,
    pub detail: Option<String>,
    pub location: Option<String>,
    pub constraint: Option<String>,
}

impl StoreDiagnostic {
    /// Only SQLSTATE class 23 (integrity constraint violation) is blamed on
    /// the submitted record. Values reach the backend already typed, so any
    /// other class, including 22 (data exception), stems from stored data.
    pub fn is_client_fault(&self) -> bool {
        matches!(self.code.as_deref().and_then(|c| c.get(..2)), Some("23"))
    }

    fn from_database_error(err: &dyn sqlx::error::DatabaseError) -> Self {
        let mut diagnostic = Self {
            message: err.message().to_string(),
            code: err.code().map(|c| c.into_owned()),
            constraint: err.constraint().map(str::to_string),
            ..Default::default()
        };

        if let Some(pg) = err.try_downcast_ref::<PgDatabaseError>() {
            diagnostic.detail = pg.detail().map(str::to_string);
            diagnostic.location = pg.r#where().map(str::to_string);
        }

        diagnostic
    }
}

impl fmt::Display for StoreDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SQL Error: {}, Detail: {}, Where: {}, Code: {}",
            self.message,
            self.detail.as_deref().unwrap_or(""),
            self.location.as_deref().unwrap_or(""),
            self.code.as_deref().unwrap_or("")
        )
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Parse(#[from] MonthParseError),

    #[error("{0}")]
    Validation(String),

    #[error("subscription {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Store(StoreDiagnostic),

    #[error("Database error: {0}")]
    Database(anyhow::Error),
}

impl ServiceError {
    /// Label used for the error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Parse(_) => "parse_error",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Store(_) => "store_error",
            ServiceError::Database(_) => "db_error",
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                ServiceError::Store(StoreDiagnostic::from_database_error(db_err.as_ref()))
            }
            other => ServiceError::Database(anyhow::Error::new(other)),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Parse(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::NotFound(id) => {
                AppError::NotFound(anyhow::anyhow!("subscription {} not found", id))
            }
            ServiceError::Store(diag) if diag.is_client_fault() => {
                AppError::BadRequest(anyhow::anyhow!(diag.to_string()))
            }
            ServiceError::Store(diag) => AppError::DatabaseError(anyhow::anyhow!(diag.to_string())),
            ServiceError::Database(e) => AppError::DatabaseError(e),
        }
    }
}
