//! Request-level input validation for the auth endpoints.

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Checks the email shape: exactly one `@`, non-empty local part, and a
/// domain containing a dot, with no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    // The dot must separate non-empty labels.
    domain.split('.').count() >= 2 && domain.split('.').all(|label| !label.is_empty())
}

/// Checks the password meets the minimum length (in characters, not bytes).
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}
