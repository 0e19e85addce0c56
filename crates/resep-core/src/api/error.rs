use thiserror::Error;

/// Why a backend call produced no envelope.
///
/// A backend that answers with `success: false` is not an `ApiError`; that
/// reaches callers as a failure envelope. These are the cases where there is
/// nothing to read: the request never completed, or the response was not an
/// envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - user identifier may be invalid")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Seconds the request was allowed to run
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Error bodies are quoted in messages up to this many characters
const BODY_EXCERPT_CHARS: usize = 500;

impl ApiError {
    /// First `BODY_EXCERPT_CHARS` characters of `body`, cut on a char boundary.
    fn excerpt(body: &str) -> String {
        match body.char_indices().nth(BODY_EXCERPT_CHARS) {
            None => body.to_string(),
            Some((cut, _)) => format!("{}... ({} bytes in total)", &body[..cut], body.len()),
        }
    }

    /// Map a non-2xx status that carried no failure envelope.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(Self::excerpt(body)),
            404 => ApiError::NotFound(Self::excerpt(body)),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(Self::excerpt(body)),
            other => ApiError::InvalidResponse(format!("Unexpected status {}: {}", other, Self::excerpt(body))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(ApiError::from_status(401, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(404, "gone"), ApiError::NotFound(ref b) if b == "gone"));
        assert!(matches!(ApiError::from_status(429, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(503, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(418, ""), ApiError::InvalidResponse(ref m) if m.starts_with("Unexpected status 418")));
    }

    #[test]
    fn test_long_body_is_cut_on_char_boundary() {
        let body = "é".repeat(BODY_EXCERPT_CHARS + 10);
        let excerpt = ApiError::excerpt(&body);
        assert!(excerpt.ends_with(&format!("({} bytes in total)", body.len())));
        assert!(excerpt.starts_with(&"é".repeat(BODY_EXCERPT_CHARS)));
    }

    #[test]
    fn test_short_body_untouched() {
        assert_eq!(ApiError::excerpt("oops"), "oops");
    }
}
