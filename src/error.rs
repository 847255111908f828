use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Failure kinds for the whole pipeline. The HTTP façade maps kinds to
/// status codes instead of pattern-matching on message text.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("No file provided")]
    MissingFile,
    #[error("No selected file")]
    EmptyFilename,
    #[error("Unusable upload filename: '{0}'")]
    BadUploadName(String),
    #[error("Malformed multipart request: {0}")]
    Multipart(String),
    #[error(
        "Missing required columns. Required: [latitude, longitude, region, health_metric]; missing: [{}]",
        .missing.join(", ")
    )]
    MissingColumns { missing: Vec<String> },
    #[error("Row {row}: column '{column}' has invalid value '{value}'")]
    InvalidField {
        row: usize,
        column: String,
        value: String,
    },
    #[error("No data rows to map")]
    EmptyTable,
    #[error("Error processing file: {0}")]
    Csv(#[from] csv::Error),
    #[error("Error rendering map: {0}")]
    Render(String),
    #[error("Map not found")]
    NotFound,
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

impl MapError {
    pub fn status(&self) -> StatusCode {
        match self {
            MapError::MissingFile
            | MapError::EmptyFilename
            | MapError::BadUploadName(_)
            | MapError::Multipart(_)
            | MapError::MissingColumns { .. }
            | MapError::InvalidField { .. }
            | MapError::EmptyTable => StatusCode::BAD_REQUEST,
            MapError::NotFound => StatusCode::NOT_FOUND,
            MapError::Csv(_) | MapError::Render(_) | MapError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for MapError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(MapError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(MapError::EmptyFilename.status(), StatusCode::BAD_REQUEST);
        let err = MapError::MissingColumns {
            missing: vec!["health_metric".into()],
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_columns_message_names_the_missing_set() {
        let err = MapError::MissingColumns {
            missing: vec!["latitude".into(), "health_metric".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("latitude, health_metric"));
        assert!(msg.contains("Required"));
    }

    #[test]
    fn not_found_maps_to_404_and_io_to_500() {
        assert_eq!(MapError::NotFound.status(), StatusCode::NOT_FOUND);
        let io = MapError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
