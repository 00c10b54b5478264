//! Client error taxonomy.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors from the HTTP client protocol.
///
/// Every variant carries the operation context (method and path) needed to
/// diagnose a failure without a debugger. Retryability is a property of the
/// variant, checked via [`ClientError::is_retryable`], never by inspecting
/// messages.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A conditional write found the resource changed since it was read.
    /// The caller should re-read, recompute, and retry.
    #[error("{method} {path}: precondition failed: {message}")]
    Conflict {
        /// HTTP method of the failed request.
        method: String,
        /// Resource path of the failed request.
        path: String,
        /// Response body, for diagnostics.
        message: String,
    },

    /// The server answered outside the 2xx range (and outside the
    /// conditional-write conflict case).
    #[error("{method} {path}: HTTP {status}: {message}")]
    Api {
        /// HTTP method of the failed request.
        method: String,
        /// Resource path of the failed request.
        path: String,
        /// Response status code.
        status: u16,
        /// Response body, for diagnostics.
        message: String,
    },

    /// The request never produced a usable response.
    #[error("{method} {path}: transport error: {source}")]
    Transport {
        /// HTTP method of the failed request.
        method: String,
        /// Resource path of the failed request.
        path: String,
        /// Underlying transport failure.
        #[source]
        source: reqwest::Error,
    },

    /// A resource path did not combine with the base URL.
    #[error("invalid URL {url:?}: {source}")]
    Url {
        /// The URL that failed to parse.
        url: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// A response body did not decode into the caller's type.
    #[error("{method} {path}: decoding response body: {source}")]
    Decode {
        /// HTTP method of the request.
        method: String,
        /// Resource path of the request.
        path: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// A request body did not encode.
    #[error("{method} {path}: encoding request body: {source}")]
    Encode {
        /// HTTP method of the request.
        method: String,
        /// Resource path of the request.
        path: String,
        /// Underlying encode failure.
        #[source]
        source: serde_json::Error,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("constructing HTTP client: {source}")]
    Build {
        /// Underlying construction failure.
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    /// True when a fresh read followed by a retry of the same operation may
    /// succeed. Only a conditional-write conflict qualifies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = ClientError::Conflict {
            method: "PUT".into(),
            path: "/gdm".into(),
            message: "etag mismatch".into(),
        };
        assert!(conflict.is_retryable());

        let api = ClientError::Api {
            method: "PUT".into(),
            path: "/gdm".into(),
            status: 500,
            message: "boom".into(),
        };
        assert!(!api.is_retryable());
    }

    #[test]
    fn errors_carry_operation_context() {
        let err = ClientError::Api {
            method: "GET".into(),
            path: "/gdm".into(),
            status: 404,
            message: "no such resource".into(),
        };
        let text = err.to_string();
        assert!(text.contains("GET"));
        assert!(text.contains("/gdm"));
        assert!(text.contains("404"));
    }
}
