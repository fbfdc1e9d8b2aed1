use paydesk_auth::{AuthError, AuthResult};

const TOTP_DIGITS: usize = 6;

/// Second factor submitted against a login challenge.
///
/// Build through [`SecondFactor::totp`] / [`SecondFactor::recovery`] so the
/// code is normalised before it leaves the process.
#[derive(Clone, PartialEq, Eq)]
pub enum SecondFactor {
    Totp(String),
    Recovery(String),
}

impl SecondFactor {
    pub fn totp(code: &str) -> AuthResult<Self> {
        normalize_totp_code(code).map(SecondFactor::Totp)
    }

    pub fn recovery(code: &str) -> AuthResult<Self> {
        normalize_recovery_code(code).map(SecondFactor::Recovery)
    }

    pub fn method(&self) -> &'static str {
        match self {
            SecondFactor::Totp(_) => "totp",
            SecondFactor::Recovery(_) => "recovery",
        }
    }
}

impl core::fmt::Debug for SecondFactor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SecondFactor::{}(<redacted>)", self.method())
    }
}

/// Keep digits only; exactly six must remain.
pub fn normalize_totp_code(code: &str) -> AuthResult<String> {
    let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != TOTP_DIGITS {
        return Err(AuthError::validation("authentication code must be 6 digits"));
    }
    Ok(digits)
}

/// Strip whitespace and upper-case.
pub fn normalize_recovery_code(code: &str) -> AuthResult<String> {
    let normalized: String = code
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(AuthError::validation("recovery code is required"));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totp_keeps_digits_only() {
        assert_eq!(normalize_totp_code(" 123 456 ").unwrap(), "123456");
        assert_eq!(normalize_totp_code("123-456").unwrap(), "123456");
        assert!(normalize_totp_code("12345").is_err());
        assert!(normalize_totp_code("1234567").is_err());
        assert!(normalize_totp_code("abcdef").is_err());
    }

    #[test]
    fn recovery_is_uppercased_without_whitespace() {
        assert_eq!(normalize_recovery_code(" abcd-efgh \n").unwrap(), "ABCD-EFGH");
        assert_eq!(normalize_recovery_code("ab cd").unwrap(), "ABCD");
        assert!(normalize_recovery_code("   ").is_err());
    }

    #[test]
    fn debug_hides_code() {
        let factor = SecondFactor::totp("123456").unwrap();
        assert_eq!(format!("{factor:?}"), "SecondFactor::totp(<redacted>)");
    }
}
