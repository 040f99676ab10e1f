//! Two-phase creation of a catalog against a remote tracker.
//!
//! Parents are created in catalog order. Each created parent has its
//! children created immediately afterwards, linked to the parent's fresh
//! [`RemoteId`]. A failed parent is recorded and its children are recorded
//! as skipped without any remote call. No failure ever aborts the run.
//!
//! Exactly one remote call is in flight at any time; pacing happens on the
//! calling thread between steps.

use crate::client::{RemoteCreationError, RemoteIssueClient};
use crate::model::{Catalog, ChildItemSpec, ItemLevel, ParentItemSpec, RemoteId};
use crate::pacing::{PacingPolicy, Pause};
use crate::report::{ImportOutcome, ImportReport, OutcomeResult, SkipCause};
use tracing::{debug, info, info_span, warn};

/// Progress notifications emitted while a run is underway.
#[derive(Debug, Clone, Copy)]
pub enum ImportEvent<'a> {
    /// About to create the parent at `index` (0-based) of `total`.
    ParentStarted {
        index: usize,
        total: usize,
        spec: &'a ParentItemSpec,
    },
    /// The parent creation call reached a terminal state.
    ParentFinished { outcome: &'a ImportOutcome },
    /// A child creation call reached a terminal state. `total` is the
    /// number of children owned by the parent.
    ChildFinished {
        total: usize,
        outcome: &'a ImportOutcome,
    },
    /// A child was recorded as skipped because its parent failed.
    ChildSkipped { outcome: &'a ImportOutcome },
}

/// Receives [`ImportEvent`]s in run order.
pub trait ProgressObserver {
    fn on_event(&mut self, event: &ImportEvent<'_>);
}

impl<F: FnMut(&ImportEvent<'_>)> ProgressObserver for F {
    fn on_event(&mut self, event: &ImportEvent<'_>) {
        self(event);
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_event(&mut self, _event: &ImportEvent<'_>) {}
}

/// Drives a [`RemoteIssueClient`] through a [`Catalog`].
pub struct ImportEngine<C, P> {
    client: C,
    pacing: P,
}

impl<C: RemoteIssueClient, P: PacingPolicy> ImportEngine<C, P> {
    pub const fn new(client: C, pacing: P) -> Self {
        Self { client, pacing }
    }

    /// Give back the client and pacing policy.
    pub fn into_parts(self) -> (C, P) {
        (self.client, self.pacing)
    }

    /// Import every item of `catalog`, reporting progress to `observer`.
    pub fn run(&mut self, catalog: &Catalog, observer: &mut dyn ProgressObserver) -> ImportReport {
        let span = info_span!(
            "import",
            epics = catalog.parent_count(),
            stories = catalog.child_count()
        );
        let _guard = span.enter();

        let total = catalog.parent_count();
        let mut outcomes = Vec::with_capacity(total + catalog.child_count());

        for (index, parent) in catalog.items().iter().enumerate() {
            observer.on_event(&ImportEvent::ParentStarted {
                index,
                total,
                spec: parent,
            });

            let (result, attempts) = self.call(|client| client.create_parent(parent));
            let outcome = ImportOutcome {
                level: ItemLevel::Parent,
                parent_index: index,
                child_index: None,
                summary: parent.summary.clone(),
                weight: 0,
                attempts,
                result: to_outcome_result(result),
            };

            let created = outcome.remote().cloned();
            match &created {
                Some(remote) => info!(key = %remote, summary = %parent.summary, "epic created"),
                None => warn!(summary = %parent.summary, result = ?outcome.result, "epic failed"),
            }
            observer.on_event(&ImportEvent::ParentFinished { outcome: &outcome });
            outcomes.push(outcome);

            match created {
                Some(remote) => {
                    self.create_children(index, parent, &remote, &mut outcomes, observer);
                }
                None => skip_children(index, parent, &mut outcomes, observer),
            }

            self.pacing.wait(Pause::BetweenParents);
        }

        let report = ImportReport::from_outcomes(outcomes);
        info!(
            epics_created = report.parents.created,
            epics_failed = report.parents.failed,
            stories_created = report.children.created,
            stories_failed = report.children.failed,
            stories_skipped = report.children.skipped,
            points = report.points_created,
            "import finished"
        );
        report
    }

    fn create_children(
        &mut self,
        parent_index: usize,
        parent: &ParentItemSpec,
        remote: &RemoteId,
        outcomes: &mut Vec<ImportOutcome>,
        observer: &mut dyn ProgressObserver,
    ) {
        let total = parent.children.len();
        for (index, child) in parent.children.iter().enumerate() {
            let (result, attempts) = self.call(|client| client.create_child(child, remote));
            let outcome = child_outcome(
                parent_index,
                index,
                child,
                attempts,
                to_outcome_result(result),
            );

            match &outcome.result {
                OutcomeResult::Created { remote: key } => {
                    info!(key = %key, parent = %remote, points = child.weight, "story created");
                }
                other => warn!(
                    parent = %remote,
                    summary = %child.summary,
                    result = ?other,
                    "story failed"
                ),
            }
            observer.on_event(&ImportEvent::ChildFinished {
                total,
                outcome: &outcome,
            });
            outcomes.push(outcome);

            self.pacing.wait(Pause::BetweenChildren);
        }
    }

    /// Issue one creation call, reissuing it while the pacing policy asks
    /// for a retry. Returns the final result and the number of calls made.
    fn call<T>(
        &mut self,
        mut request: impl FnMut(&mut C) -> Result<T, RemoteCreationError>,
    ) -> (Result<T, RemoteCreationError>, u32) {
        let mut attempt = 1;
        loop {
            match request(&mut self.client) {
                Ok(value) => return (Ok(value), attempt),
                Err(err) if self.pacing.should_retry(attempt, &err) => {
                    debug!(attempt, error = %err, "retrying remote call");
                    self.pacing.wait(Pause::BeforeRetry { attempt });
                    attempt += 1;
                }
                Err(err) => return (Err(err), attempt),
            }
        }
    }
}

fn skip_children(
    parent_index: usize,
    parent: &ParentItemSpec,
    outcomes: &mut Vec<ImportOutcome>,
    observer: &mut dyn ProgressObserver,
) {
    for (index, child) in parent.children.iter().enumerate() {
        let outcome = child_outcome(
            parent_index,
            index,
            child,
            0,
            OutcomeResult::Skipped {
                cause: SkipCause::ParentFailed,
            },
        );
        debug!(summary = %child.summary, "story skipped");
        observer.on_event(&ImportEvent::ChildSkipped { outcome: &outcome });
        outcomes.push(outcome);
    }
}

fn child_outcome(
    parent_index: usize,
    index: usize,
    child: &ChildItemSpec,
    attempts: u32,
    result: OutcomeResult,
) -> ImportOutcome {
    ImportOutcome {
        level: ItemLevel::Child,
        parent_index,
        child_index: Some(index),
        summary: child.summary.clone(),
        weight: child.weight,
        attempts,
        result,
    }
}

fn to_outcome_result(result: Result<RemoteId, RemoteCreationError>) -> OutcomeResult {
    match result {
        Ok(remote) => OutcomeResult::Created { remote },
        Err(err) => OutcomeResult::Failed {
            status: err.status,
            reason: err.to_string(),
        },
    }
}

/// Import `catalog` without progress reporting.
pub fn run_import<C: RemoteIssueClient, P: PacingPolicy>(
    catalog: &Catalog,
    client: C,
    pacing: P,
) -> ImportReport {
    ImportEngine::new(client, pacing).run(catalog, &mut NoProgress)
}

/// Import `catalog`, forwarding progress events to `observer`.
pub fn run_import_with_progress<C: RemoteIssueClient, P: PacingPolicy>(
    catalog: &Catalog,
    client: C,
    pacing: P,
    observer: &mut dyn ProgressObserver,
) -> ImportReport {
    ImportEngine::new(client, pacing).run(catalog, observer)
}
