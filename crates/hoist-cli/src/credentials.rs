//! Jira account credentials, read once from the environment.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hoist_core::error::PreconditionError;
use std::fmt;

pub const EMAIL_VAR: &str = "JIRA_EMAIL";
pub const TOKEN_VAR: &str = "JIRA_API_TOKEN";

/// Account email plus API token used for basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    #[cfg(test)]
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
        }
    }

    /// Read `JIRA_EMAIL` and `JIRA_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionError::MissingCredentials`] naming every
    /// variable that is unset or blank.
    pub fn from_env() -> Result<Self, PreconditionError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PreconditionError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let email = read(EMAIL_VAR);
        let token = read(TOKEN_VAR);

        match (email, token) {
            (Some(email), Some(token)) => Ok(Self { email, token }),
            (email, token) => {
                let mut missing = Vec::new();
                if email.is_none() {
                    missing.push(EMAIL_VAR);
                }
                if token.is_none() {
                    missing.push(TOKEN_VAR);
                }
                Err(PreconditionError::MissingCredentials { missing })
            }
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Value for the `Authorization` header.
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.email, self.token);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

/// Shell snippet printed when credentials are missing.
pub fn setup_instructions() -> String {
    format!(
        "  export {EMAIL_VAR}='your-email@example.com'\n  export {TOKEN_VAR}='your-api-token'"
    )
}
