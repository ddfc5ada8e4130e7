//! Credential checks.
//!
//! The admin login is a static pair checked on the client; the reset endpoint
//! takes a shared secret. Both use constant-time comparison.

use subtle::ConstantTimeEq;

/// Login name of the single administrator account.
pub const ADMIN_USERNAME: &str = "admin";
/// Password of the single administrator account.
pub const ADMIN_PASSWORD: &str = "admin";
/// Name recorded in sessions and log entries for the administrator.
pub const ADMIN_DISPLAY_NAME: &str = "Administrador";

/// Check the static admin pair and return the display name on success.
pub fn verify_admin(username: &str, password: &str) -> Option<&'static str> {
    // Evaluate both halves so a wrong username costs the same as a wrong password.
    let user_ok = constant_time_compare(username.trim(), ADMIN_USERNAME);
    let pass_ok = constant_time_compare(password, ADMIN_PASSWORD);
    if user_ok & pass_ok {
        Some(ADMIN_DISPLAY_NAME)
    } else {
        None
    }
}

/// Check the shared secret guarding `/api/reset`.
pub fn verify_reset_password(provided: &str, expected: &str) -> bool {
    constant_time_compare(provided, expected)
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    a_bytes.ct_eq(b_bytes).into()
}
