pub mod import;
pub mod validate;

use hoist_core::config::ConfigError;
use hoist_core::error::{ErrorCode, PreconditionError};
use hoist_core::{Catalog, CatalogError};
use std::fmt;
use std::path::Path;

/// An input file failed to load. Carries the code the operator sees.
#[derive(Debug)]
pub struct InputError {
    code: ErrorCode,
    source: anyhow::Error,
}

impl InputError {
    pub const fn new(code: ErrorCode, source: anyhow::Error) -> Self {
        Self { code, source }
    }

    pub const fn code(&self) -> ErrorCode {
        self.code
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.source)
    }
}

impl std::error::Error for InputError {}

/// Load and validate a catalog, tagging failures with their code.
pub fn load_catalog(path: &Path) -> Result<Catalog, InputError> {
    hoist_core::model::catalog::load_catalog(path).map_err(|err| {
        let code = err
            .downcast_ref::<CatalogError>()
            .map_or(ErrorCode::CatalogUnreadable, CatalogError::code);
        InputError::new(code, err)
    })
}

/// Pick the operator-facing code for a fatal command error.
pub fn error_code(err: &anyhow::Error) -> ErrorCode {
    if let Some(input) = err.downcast_ref::<InputError>() {
        return input.code();
    }
    if let Some(precondition) = err.downcast_ref::<PreconditionError>() {
        return precondition.code();
    }
    if let Some(config) = err.downcast_ref::<ConfigError>() {
        return config.code();
    }
    if let Some(catalog) = err.downcast_ref::<CatalogError>() {
        return catalog.code();
    }
    ErrorCode::InternalUnexpected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn invalid_entry_is_catalog_invalid() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("catalog.toml");
        fs::write(&path, "[[epics]]\ntitle = \"A\"\nsummary = \"  \"\n").expect("write");

        let err = load_catalog(&path).expect_err("empty summary");
        assert_eq!(err.code(), ErrorCode::CatalogInvalid);
    }

    #[test]
    fn missing_file_is_catalog_unreadable() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_catalog(&dir.path().join("nope.json")).expect_err("missing");
        assert_eq!(err.code(), ErrorCode::CatalogUnreadable);
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn error_code_sees_through_context() {
        use anyhow::Context as _;

        let err: anyhow::Error = Err::<(), _>(ConfigError::Missing { field: "project_key" })
            .context("resolving import target")
            .expect_err("error");
        assert_eq!(error_code(&err), ErrorCode::ConfigIncomplete);

        let err = anyhow::Error::new(PreconditionError::MissingCredentials {
            missing: vec!["JIRA_EMAIL"],
        });
        assert_eq!(error_code(&err), ErrorCode::MissingCredentials);

        assert_eq!(
            error_code(&anyhow::anyhow!("boom")),
            ErrorCode::InternalUnexpected
        );
    }
}
