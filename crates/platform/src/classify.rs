//! Classification of platform API failures

use crate::ErrorClassification;

/// Classify a failed platform response by HTTP status.
///
/// 401/403 mean the credential behind the handle is no longer accepted.
/// Telegram reports a revoked bot token as 401 as well, and 404 on the
/// `/bot<token>/` path when the token is malformed.
pub fn classify_status(status: u16, bot_path: bool) -> ErrorClassification {
    match status {
        401 | 403 => ErrorClassification::Permanent,
        404 if bot_path => ErrorClassification::Permanent,
        429 => ErrorClassification::RateLimited,
        _ => ErrorClassification::Transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_permanent() {
        assert_eq!(classify_status(401, false), ErrorClassification::Permanent);
        assert_eq!(classify_status(403, false), ErrorClassification::Permanent);
    }

    #[test]
    fn rate_limit_keeps_handle() {
        assert_eq!(classify_status(429, false), ErrorClassification::RateLimited);
    }

    #[test]
    fn not_found_depends_on_bot_path() {
        assert_eq!(classify_status(404, false), ErrorClassification::Transient);
        assert_eq!(classify_status(404, true), ErrorClassification::Permanent);
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [408, 500, 502, 503, 504] {
            assert_eq!(classify_status(status, false), ErrorClassification::Transient);
        }
    }
}
