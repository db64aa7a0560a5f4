//! Session-expiry detection on raw upstream bodies.

use crate::error::BillingError;

/// Substring ("log in") present only when the upstream served its login page.
pub const SESSION_EXPIRED_MARKER: &str = "登录";

/// Fail with [`BillingError::SessionExpired`] if `body` is the login page.
///
/// Runs on the raw text before any JSON parsing, whatever the status code
/// or content type, so an HTML redirect never surfaces as a parse failure.
pub fn ensure_session_valid(body: &str) -> Result<(), BillingError> {
    if body.contains(SESSION_EXPIRED_MARKER) {
        return Err(BillingError::SessionExpired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_is_valid() {
        assert!(ensure_session_valid(r#"{"status":true,"ok":true}"#).is_ok());
    }

    #[test]
    fn test_login_page_is_expired() {
        let html = "<html><title>登录 - SiliconCloud</title></html>";
        assert!(matches!(
            ensure_session_valid(html),
            Err(BillingError::SessionExpired)
        ));
    }

    #[test]
    fn test_marker_inside_broken_json_is_expired() {
        let body = r#"{"status": false, "message": "请先登录"#;
        assert!(matches!(
            ensure_session_valid(body),
            Err(BillingError::SessionExpired)
        ));
    }
}
