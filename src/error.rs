use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};

/// Central error type for the marketplace core.
///
/// Every operation failure falls into one of five kinds, each mapping to a
/// single HTTP status. Precondition failures never leave partial state
/// behind; `Internal` is the only kind where the outcome of the attempted
/// write is unknown to the caller.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// A request field violated its bounds. Rejected before any mutation.
    #[error("{0}")]
    InvalidInput(String),

    /// The caller is authenticated but not allowed to perform this action.
    #[error("{0}")]
    Forbidden(String),

    /// A referenced gig, bid, or user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A state-machine precondition failed: wrong status, duplicate bid,
    /// or a lost race on the hiring transition.
    #[error("{0}")]
    Conflict(String),

    /// Storage failure. The detail is logged, never returned to the caller.
    #[error("internal error")]
    Internal(#[source] DbErr),
}

impl MarketError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbErr> for MarketError {
    fn from(err: DbErr) -> Self {
        // A unique-index violation is a lost race with another caller, not
        // a server fault.
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return Self::Conflict("A conflicting record already exists".to_string());
        }
        match err {
            DbErr::RecordNotFound(msg) => Self::NotFound(msg),
            other => Self::Internal(other),
        }
    }
}

impl ResponseError for MarketError {
    fn status_code(&self) -> StatusCode {
        MarketError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Internal(source) = self {
            tracing::error!("storage error: {source}");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_expected_status_codes() {
        let cases = [
            (
                MarketError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (MarketError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (MarketError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (MarketError::Conflict("lost".into()), StatusCode::CONFLICT),
            (
                MarketError::Internal(DbErr::Custom("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn internal_never_leaks_storage_detail() {
        let err = MarketError::Internal(DbErr::Custom("password=hunter2".into()));
        assert_eq!(err.to_string(), "internal error");
    }

    #[test]
    fn record_not_found_becomes_not_found() {
        let err: MarketError = DbErr::RecordNotFound("Gig not found".into()).into();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[test]
    fn other_db_errors_become_internal() {
        let err: MarketError = DbErr::Custom("connection reset".into()).into();
        assert!(matches!(err, MarketError::Internal(_)));
    }
}
