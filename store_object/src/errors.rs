use crate::validation::ValidationError;
use signal_system::SignalError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Database error on {table} ({operation}): {message}")]
    Database {
        table: String,
        operation: String,
        message: String,
    },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation on {table}: {message}")]
    Constraint { table: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Procedure {name} failed: {message}")]
    Procedure { name: String, message: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn database(table: &str, operation: &str, message: impl Into<String>) -> Self {
        StoreError::Database {
            table: table.to_string(),
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn constraint(table: &str, message: impl Into<String>) -> Self {
        StoreError::Constraint {
            table: table.to_string(),
            message: message.into(),
        }
    }

    pub fn procedure(name: &str, message: impl Into<String>) -> Self {
        StoreError::Procedure {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Classify a driver error raised while running `operation` against `table`.
    ///
    /// SQLSTATE class 23 is an integrity violation, 42P01 an undefined table.
    pub fn database_operation(table: &str, operation: &str, error: sqlx::Error) -> Self {
        if let Some(db_error) = error.as_database_error() {
            let code = db_error.code().map(|c| c.into_owned()).unwrap_or_default();
            let message = db_error.message().to_string();
            if code.starts_with("23") {
                return StoreError::constraint(table, message);
            }
            if code == "42P01" {
                return StoreError::UnknownTable(table.to_string());
            }
            return StoreError::database(table, operation, message);
        }

        match error {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                StoreError::Unavailable(error.to_string())
            }
            other => StoreError::database(table, operation, other.to_string()),
        }
    }

    /// Classify a driver error raised by a remote procedure call.
    ///
    /// Exceptions raised by the procedure body (SQLSTATE P0001) and missing
    /// functions (42883) report as procedure failures.
    pub fn procedure_call(name: &str, error: sqlx::Error) -> Self {
        if let Some(db_error) = error.as_database_error() {
            let code = db_error.code().map(|c| c.into_owned()).unwrap_or_default();
            if code == "P0001" || code == "42883" {
                return StoreError::procedure(name, db_error.message());
            }
        }
        StoreError::database_operation(name, "call", error)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint { .. })
    }
}

impl From<ValidationError> for StoreError {
    fn from(error: ValidationError) -> Self {
        StoreError::Validation(error.to_string())
    }
}

impl From<SignalError> for StoreError {
    fn from(error: SignalError) -> Self {
        StoreError::Subscription(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        let error = StoreError::database_operation("enhanced_products", "select", sqlx::Error::PoolClosed);
        assert!(matches!(error, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_validation_conversion() {
        let error: StoreError = ValidationError::Empty.into();
        assert_eq!(error, StoreError::Validation("Name cannot be empty".to_string()));
    }

    #[test]
    fn test_display_includes_context() {
        let error = StoreError::constraint("enhanced_brands", "duplicate key value");
        assert_eq!(
            error.to_string(),
            "Constraint violation on enhanced_brands: duplicate key value"
        );
    }
}
