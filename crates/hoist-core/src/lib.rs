//! hoist-core library.
//!
//! Catalog model, the remote client capability, pacing policies and the
//! import engine that creates an epic/story hierarchy in a remote tracker.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` errors at module seams, `anyhow::Result`
//!   for file and config plumbing.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod pacing;
pub mod report;

pub use client::{RemoteCreationError, RemoteIssueClient};
pub use engine::{
    ImportEngine, ImportEvent, NoProgress, ProgressObserver, run_import, run_import_with_progress,
};
pub use model::{Catalog, CatalogError, ChildItemSpec, ItemLevel, ParentItemSpec, RemoteId};
pub use pacing::{BackoffPacing, FixedPacing, PacingPolicy, Pause};
pub use report::{ImportOutcome, ImportReport, LevelTally, OutcomeResult, SkipCause};
