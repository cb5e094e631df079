//! Bearer token check for the revalidate endpoint.
//!
//! Neos authenticates with `Authorization: Bearer <token>`. The whole header
//! value is compared against the expected value in constant time so the
//! response time does not reveal how much of the token matched.

use subtle::ConstantTimeEq;

/// Scheme prefix of the `Authorization` header.
const BEARER_PREFIX: &str = "Bearer ";

/// Formats the `Authorization` header value for a token.
///
/// # Example
///
/// ```
/// use grazer::server::auth::bearer_header;
///
/// assert_eq!(bearer_header("s3cret"), "Bearer s3cret");
/// ```
pub fn bearer_header(token: &str) -> String {
    format!("{BEARER_PREFIX}{token}")
}

/// Verifies an `Authorization` header value against the expected token.
///
/// A missing header never verifies. The comparison covers the scheme prefix
/// too, so `bearer <token>` (lowercase) is rejected.
///
/// # Example
///
/// ```
/// use grazer::server::auth::verify_bearer;
///
/// assert!(verify_bearer(Some("Bearer s3cret"), "s3cret"));
/// assert!(!verify_bearer(Some("Bearer wrong"), "s3cret"));
/// assert!(!verify_bearer(None, "s3cret"));
/// ```
pub fn verify_bearer(header: Option<&str>, token: &str) -> bool {
    let Some(header) = header else {
        return false;
    };
    let expected = bearer_header(token);
    header.as_bytes().ct_eq(expected.as_bytes()).into()
}
