// Copyright 2023 Remi Bernotavicius

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::DatabaseErrorKind;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    NotFound(String),
    Unauthorized,
    Invalid(String),
    Database(diesel::result::Error),
    Connection(diesel::ConnectionError),
    Migration(Box<dyn std::error::Error + Send + Sync + 'static>),
    Io(std::io::Error),
    Task(tokio::task::JoinError),
    Logger(log::SetLoggerError),
    Template(minijinja::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::Unauthorized => write!(f, "authentication credentials were not provided"),
            Self::Invalid(reason) => write!(f, "{reason}"),
            Self::Database(e) => write!(f, "database error: {e}"),
            Self::Connection(e) => write!(f, "database connection error: {e}"),
            Self::Migration(e) => write!(f, "migration error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Task(e) => write!(f, "blocking task failed: {e}"),
            Self::Logger(e) => write!(f, "logger error: {e}"),
            Self::Template(e) => write!(f, "template error: {e:#}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::Error as DieselError;

        match e {
            DieselError::NotFound => Self::NotFound("record".into()),
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation,
                info,
            ) => Self::Invalid(info.message().into()),
            e => Self::Database(e),
        }
    }
}

impl From<diesel::ConnectionError> for Error {
    fn from(e: diesel::ConnectionError) -> Self {
        Self::Connection(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e)
    }
}

impl From<log::SetLoggerError> for Error {
    fn from(e: log::SetLoggerError) -> Self {
        Self::Logger(e)
    }
}

impl From<minijinja::Error> for Error {
    fn from(e: minijinja::Error) -> Self {
        Self::Template(e)
    }
}

impl Error {
    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthorized => "not_authenticated",
            Self::Invalid(_) => "invalid",
            _ => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            log::error!("{self}");
            "internal server error".to_owned()
        } else {
            self.to_string()
        };
        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": message,
        }));

        if let Self::Unauthorized = self {
            (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer realm=\"galley-mate\"")],
                body,
            )
                .into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[test]
fn diesel_errors_map_to_status() {
    let e = Error::from(diesel::result::Error::NotFound);
    assert_eq!(e.status(), StatusCode::NOT_FOUND);

    let e = Error::from(diesel::result::Error::RollbackTransaction);
    assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn unauthorized_response_has_challenge() {
    let response = Error::Unauthorized.into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}
