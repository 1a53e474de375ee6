use thiserror::Error;

/// Centralized error types for the library
///
/// Collaborator failures (feed, settings store, transport) all surface as
/// this enum. Navigation rejections are not errors and never end up here.
///
/// # Example
///
/// ```no_run
/// use hkocore::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP/transport errors talking to the observatory feed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// JSON decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Feed returned something we cannot use
    #[error("Feed error: {0}")]
    Feed(String),

    /// Settings persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Telegram API errors
    #[cfg(feature = "telegram")]
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Feed errors are the ones worth retrying on the next tick or tap.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Http(_) | AppError::HttpStatus(_) | AppError::Feed(_))
    }
}
