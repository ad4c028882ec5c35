//! Error types for the Polymarket CLOB client.
//!
//! This module defines all error types that can occur when using the crate.

/// The main error type for the CLOB client.
#[derive(Debug, thiserror::Error)]
pub enum ClobError {
    /// Hex string could not be decoded.
    #[error("hex parse error: {0}")]
    HexParse(String),

    /// Base64 string could not be decoded.
    #[error("base64 parse error: {0}")]
    Base64Parse(String),

    /// Private key was malformed or out of range.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Signing or key-derivation failure.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// Tick size is not one of the supported values.
    #[error("unsupported tick size: {0}")]
    InvalidTickSize(String),

    /// Price is outside the valid range for the market's tick size.
    #[error("invalid price ({price}), min: {tick} - max: {}", 1.0 - .tick)]
    InvalidPrice { price: f64, tick: f64 },

    /// Order book cannot satisfy the requested amount.
    #[error("no match")]
    NoMatch,

    /// A required input was not supplied in strict-no-fetch mode.
    #[error("strict_no_fetch requires {0}")]
    MissingInput(&'static str),

    /// Authenticated operation attempted on a read-only client.
    #[error("client not authenticated")]
    NotAuthenticated,

    /// Server returned a non-2xx response.
    #[error("http error ({status}): {body}")]
    HttpError { status: u16, body: String },

    /// Socket-level failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed server response.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// WebSocket connection or communication error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// HTTP client construction or request failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP middleware request failure.
    #[error("http request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// URL parsing error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for CLOB client operations.
pub type Result<T> = std::result::Result<T, ClobError>;

impl ClobError {
    /// Creates a new transport error.
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a new WebSocket error.
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Self::WebSocket(msg.into())
    }

    /// Creates a new crypto failure.
    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        Self::CryptoFailure(msg.into())
    }

    /// Creates a generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Creates an error from a non-2xx HTTP response.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::HttpError {
            status,
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_price_display() {
        let err = ClobError::InvalidPrice {
            price: 1.5,
            tick: 0.01,
        };
        let msg = err.to_string();
        assert!(msg.contains("1.5"));
        assert!(msg.contains("0.01"));
        assert!(msg.contains("0.99"));
    }

    #[test]
    fn test_no_match_display() {
        assert_eq!(ClobError::NoMatch.to_string(), "no match");
    }

    #[test]
    fn test_missing_input_display() {
        let err = ClobError::MissingInput("tick_size");
        assert_eq!(err.to_string(), "strict_no_fetch requires tick_size");
    }

    #[test]
    fn test_http_error_creation() {
        let err = ClobError::http(404, "not found");
        assert!(matches!(err, ClobError::HttpError { status: 404, .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_transport_error_creation() {
        let err = ClobError::transport("connection timed out");
        assert!(matches!(err, ClobError::Transport(_)));
        assert!(err.to_string().contains("connection timed out"));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err: ClobError = json_err.into();
        assert!(matches!(err, ClobError::Decode(_)));
        assert!(err.to_string().contains("decode error"));
    }

    #[test]
    fn test_from_url_parse_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: ClobError = url_err.into();
        assert!(matches!(err, ClobError::Url(_)));
    }
}
