use thiserror::Error;

/// Library error type. `Configuration`, `NoColumns`, `InvalidLimit` and
/// `DuplicateRoute` surface at endpoint registration and abort startup;
/// the rest surface per-request and map to a 500 in the server layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("endpoint `{0}`: need to provide `class`, `class_name` or `relation`")]
    Configuration(String),

    #[error("endpoint `{0}`: at least one search column is required")]
    NoColumns(String),

    #[error("endpoint `{0}`: limit must be a positive integer")]
    InvalidLimit(String),

    #[error("route `{0}` is already registered")]
    DuplicateRoute(String),

    #[error("unknown collection `{0}`")]
    UnknownCollection(String),

    #[error("unknown scope `{scope}` on collection `{collection}`")]
    UnknownScope { collection: String, scope: String },

    #[error("record has no field `{0}`")]
    UnknownField(String),
}
