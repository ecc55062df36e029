//! Conversions from external infrastructure errors into domain errors.

use fieldsync_domain::FieldSyncError;
use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FieldSyncError);

impl From<InfraError> for FieldSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FieldSyncError> for InfraError {
    fn from(value: FieldSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoFieldSyncError {
    fn into_fieldsync(self) -> FieldSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → FieldSyncError */
/* -------------------------------------------------------------------------- */

impl IntoFieldSyncError for SqlError {
    fn into_fieldsync(self) -> FieldSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => FieldSyncError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        FieldSyncError::Storage("database is locked".into())
                    }
                    ErrorCode::DiskFull => FieldSyncError::Storage("disk is full".into()),
                    ErrorCode::ReadOnly => {
                        FieldSyncError::Storage("database is read-only".into())
                    }
                    ErrorCode::NotADatabase => {
                        FieldSyncError::Storage("file is not a database".into())
                    }
                    _ => FieldSyncError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => FieldSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                FieldSyncError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                FieldSyncError::Storage(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                FieldSyncError::Storage("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidPath(path) => FieldSyncError::Storage(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => FieldSyncError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_fieldsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → FieldSyncError */
/* -------------------------------------------------------------------------- */

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(FieldSyncError::Storage(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FieldSyncError */
/* -------------------------------------------------------------------------- */

impl IntoFieldSyncError for HttpError {
    fn into_fieldsync(self) -> FieldSyncError {
        if self.is_timeout() {
            return FieldSyncError::Timeout("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return FieldSyncError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_error(status, None);
        }

        if self.is_decode() {
            return FieldSyncError::Serialization(format!("invalid HTTP response body: {self}"));
        }

        FieldSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_fieldsync())
    }
}

/// Map a non-success HTTP status to a domain error.
///
/// 401/403 are auth failures, 404 is not found, 408 is a timeout, and every
/// other 4xx or 5xx is a remote rejection. `detail` is appended when the
/// server sent a body.
pub fn status_error(status: reqwest::StatusCode, detail: Option<&str>) -> FieldSyncError {
    let code = status.as_u16();
    let mut message =
        format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
    if let Some(detail) = detail.map(str::trim).filter(|d| !d.is_empty()) {
        message.push_str(": ");
        message.push_str(detail);
    }

    match code {
        401 | 403 => FieldSyncError::Auth(message),
        404 => FieldSyncError::NotFound(message),
        408 => FieldSyncError::Timeout(message),
        _ => FieldSyncError::Remote(message),
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → FieldSyncError */
/* -------------------------------------------------------------------------- */

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        let message = if value.is_panic() {
            "blocking task panicked".to_string()
        } else {
            format!("blocking task failed: {value}")
        };
        InfraError(FieldSyncError::Internal(message))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_storage_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: FieldSyncError = InfraError::from(err).into();
        match mapped {
            FieldSyncError::Storage(msg) => assert!(msg.contains("busy")),
            other => panic!("expected storage error, got {:?}", other),
        }
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: FieldSyncError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert_eq!(mapped.label(), "not_found");
    }

    #[test]
    fn status_mapping_covers_auth_not_found_timeout_and_remote() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, None), FieldSyncError::Auth(_)));
        assert!(matches!(status_error(StatusCode::FORBIDDEN, None), FieldSyncError::Auth(_)));
        assert!(matches!(status_error(StatusCode::NOT_FOUND, None), FieldSyncError::NotFound(_)));
        assert!(matches!(
            status_error(StatusCode::REQUEST_TIMEOUT, None),
            FieldSyncError::Timeout(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, None),
            FieldSyncError::Remote(_)
        ));
        match status_error(StatusCode::SERVICE_UNAVAILABLE, Some(" maintenance ")) {
            FieldSyncError::Remote(msg) => assert_eq!(msg, "HTTP 503 Service Unavailable: maintenance"),
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_status_401_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: FieldSyncError = InfraError::from(error).into();
        match mapped {
            FieldSyncError::Auth(msg) => assert!(msg.contains("401")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }
}
