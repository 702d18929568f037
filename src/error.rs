use thiserror::Error;

/// Typed failures of the filter pipeline and the admin field catalogue
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid security token")]
    InvalidToken,

    #[error("You do not have permission to view this form's fields")]
    Forbidden,

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },

    #[error("Form {0} not found")]
    FormNotFound(i64),

    #[error("View {0} not found")]
    ViewNotFound(i64),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl FilterError {
    /// HTTP-style status for callers that answer requests
    pub fn status_code(&self) -> u16 {
        match self {
            FilterError::InvalidToken
            | FilterError::MissingParameter(_)
            | FilterError::InvalidParameter { .. }
            | FilterError::InvalidJson(_) => 400,
            FilterError::Forbidden => 403,
            FilterError::FormNotFound(_) | FilterError::ViewNotFound(_) => 404,
            FilterError::Storage(_) => 500,
        }
    }

    /// Whether the failure is the caller's fault rather than an internal one
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
