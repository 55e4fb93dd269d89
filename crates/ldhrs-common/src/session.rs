//! ---
//! ldhrs_section: "06-security-access-control"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Operator login gate for the dashboard console."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
//! Operator login gate.
//!
//! Only the shape of the submitted email is checked. There is no credential
//! store and the password is discarded once it has been confirmed non-empty.

use thiserror::Error;

/// Rejection reasons surfaced to the operator on a failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Invalid email address format")]
    InvalidEmail,
}

/// An accepted operator login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSession {
    email: String,
}

impl OperatorSession {
    /// Validate a login submission.
    pub fn login(email: &str, password: &str) -> Result<Self, SessionError> {
        let email = email.trim();
        if email.is_empty() || password.trim().is_empty() {
            return Err(SessionError::MissingFields);
        }
        if !is_plausible_email(email) {
            return Err(SessionError::InvalidEmail);
        }
        Ok(Self {
            email: email.to_owned(),
        })
    }

    /// Identity string attached to audit requests.
    pub fn identity(&self) -> &str {
        &self.email
    }

    pub fn logout(self) {
        tracing::debug!(operator = %self.email, "operator session closed");
    }
}

/// `local@domain.tld`: no whitespace, a single `@`, and a dot inside the domain
/// with at least one character on either side.
pub fn is_plausible_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(idx, ch)| ch == '.' && idx > 0 && idx + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_login() {
        let session = OperatorSession::login("operator@gcuf.edu.pk", "hunter2").unwrap();
        assert_eq!(session.identity(), "operator@gcuf.edu.pk");
    }

    #[test]
    fn trims_surrounding_whitespace_from_email() {
        let session = OperatorSession::login("  ops@example.com ", "pw").unwrap();
        assert_eq!(session.identity(), "ops@example.com");
    }

    #[test]
    fn rejects_missing_fields() {
        assert_eq!(
            OperatorSession::login("", "pw"),
            Err(SessionError::MissingFields)
        );
        assert_eq!(
            OperatorSession::login("ops@example.com", "   "),
            Err(SessionError::MissingFields)
        );
        assert_eq!(
            SessionError::MissingFields.to_string(),
            "Please fill in all fields"
        );
    }

    #[test]
    fn rejects_malformed_email() {
        for email in [
            "no-at-sign.com",
            "@example.com",
            "ops@",
            "ops@localhost",
            "ops@.com",
            "ops@example.",
            "ops@@example.com",
            "o ps@example.com",
            "ops@exa@mple.com",
        ] {
            assert_eq!(
                OperatorSession::login(email, "pw"),
                Err(SessionError::InvalidEmail),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn dotted_local_parts_are_fine() {
        assert!(is_plausible_email("first.last@sub.example.org"));
        assert!(is_plausible_email("a@b.c"));
    }
}
