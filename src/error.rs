//! Structured error types for API responses.

use crate::types::TaskStatus;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Lifecycle errors
    InvalidTransition,
    PreconditionFailed,
    WriteConflict,

    // Not found errors
    NotFound,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error for API responses.
#[derive(Debug, Serialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// For invalid transitions: the statuses reachable from the current one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<TaskStatus>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            allowed: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn not_found(entity: &str, id: i64) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
    }

    pub fn invalid_transition(current: TaskStatus, requested: TaskStatus, allowed: &[TaskStatus]) -> Self {
        let mut err = Self::new(
            ErrorCode::InvalidTransition,
            format!("Cannot move task from {} to {}", current, requested),
        );
        err.allowed = Some(allowed.to_vec());
        err
    }

    pub fn precondition_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::PreconditionFailed, reason)
    }

    pub fn write_conflict(task_id: i64) -> Self {
        Self::new(
            ErrorCode::WriteConflict,
            format!("Task {} was modified concurrently, retry the request", task_id),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// HTTP status this error maps to.
    pub fn http_status(&self) -> u16 {
        match self.code {
            ErrorCode::NotFound => 404,
            ErrorCode::WriteConflict => 409,
            ErrorCode::DatabaseError | ErrorCode::InternalError => 500,
            _ => 400,
        }
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::database(err),
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
