use std::fmt;

/// Machine-readable error codes for operators and report readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingCredentials,
    ConfigParseError,
    ConfigIncomplete,
    CatalogInvalid,
    CatalogUnreadable,
    RemoteRejected,
    RateLimited,
    TransportFailed,
    ParentFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingCredentials => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ConfigIncomplete => "E1003",
            Self::CatalogInvalid => "E2001",
            Self::CatalogUnreadable => "E2002",
            Self::RemoteRejected => "E3001",
            Self::RateLimited => "E3002",
            Self::TransportFailed => "E3003",
            Self::ParentFailed => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingCredentials => "Missing credentials",
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigIncomplete => "Required project setting missing",
            Self::CatalogInvalid => "Invalid catalog entry",
            Self::CatalogUnreadable => "Catalog file could not be read",
            Self::RemoteRejected => "Remote service rejected the request",
            Self::RateLimited => "Remote service rate limit hit",
            Self::TransportFailed => "Request never reached the remote service",
            Self::ParentFailed => "Skipped because the parent item failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MissingCredentials => {
                Some("Export JIRA_EMAIL and JIRA_API_TOKEN before running `hoist import`.")
            }
            Self::ConfigParseError => Some("Fix syntax in hoist.toml and retry."),
            Self::ConfigIncomplete => Some(
                "Set base_url, project_key, epic_type_id and story_type_id in hoist.toml or pass them as flags.",
            ),
            Self::CatalogInvalid => {
                Some("Every epic needs a title and summary; every story needs a summary.")
            }
            Self::CatalogUnreadable => Some("Use a readable .toml or .json catalog file."),
            Self::RemoteRejected => {
                Some("Inspect the response body and re-run for the failed items only.")
            }
            Self::RateLimited => Some("Raise pacing delays or enable retries with --retries."),
            Self::TransportFailed => Some("Check base_url and network connectivity."),
            Self::ParentFailed => Some("Re-run once the parent item can be created."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Conditions that must hold before the first remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("missing required credentials: {}", .missing.join(", "))]
    MissingCredentials { missing: Vec<&'static str> },
}

impl PreconditionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingCredentials { .. } => ErrorCode::MissingCredentials,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
