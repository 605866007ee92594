use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ValidationError(String),
    InternalServerError(String),
    DatabaseError(sqlx::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::DatabaseError(err) => write!(f, "Database Error: {}", err),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        // Client errors carry a short message only; unexpected failures attach
        // the underlying message as `details` for diagnostics.
        match self {
            ApiError::BadRequest(msg) => HttpResponse::BadRequest().json(ErrorResponse {
                error: msg.clone(),
                details: None,
            }),
            ApiError::ValidationError(msg) => HttpResponse::BadRequest().json(ErrorResponse {
                error: msg.clone(),
                details: None,
            }),
            ApiError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse {
                error: msg.clone(),
                details: None,
            }),
            ApiError::Conflict(msg) => HttpResponse::Conflict().json(ErrorResponse {
                error: msg.clone(),
                details: None,
            }),
            ApiError::InternalServerError(msg) => {
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Internal server error".to_string(),
                    details: Some(msg.clone()),
                })
            }
            ApiError::DatabaseError(err) => HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
                details: Some(err.to_string()),
            }),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

// Доменные ошибки
impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{} not found", entity))
    }

    pub fn student_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Student with ID '{}' not found", id))
    }

    pub fn booking_conflict() -> Self {
        ApiError::Conflict("Room is already booked for this period".to_string())
    }

    pub fn only_pending_confirmable() -> Self {
        ApiError::BadRequest("Only pending bookings can be confirmed".to_string())
    }

    pub fn already_checked_out() -> Self {
        ApiError::BadRequest("Visitor already checked out".to_string())
    }

    pub fn occupancy_exceeds_capacity(occupancy: i64, capacity: i64) -> Self {
        ApiError::BadRequest(format!(
            "Occupancy ({}) cannot exceed capacity ({})",
            occupancy, capacity
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("Room").error_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::booking_conflict().error_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::ValidationError("bad".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InternalServerError("boom".into())
                .error_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = ApiError::not_found("Booking");
        assert_eq!(err.to_string(), "Not Found: Booking not found");
    }
}
