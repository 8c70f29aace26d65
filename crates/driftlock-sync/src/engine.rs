//! Execution of one sync attempt.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use driftlock_core::{
    Application, Attempt, OpOutcome, OperationRecord, RetryOutcome, RetryPolicy, SyncRecord,
    SyncTrigger,
};
use driftlock_diff::{Diff, KindOrdering};
use driftlock_target::{DynTarget, TargetError, with_timeout};
use time::OffsetDateTime;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, warn};

use crate::plan;

/// Applies diffs to the target system for one application.
///
/// The engine only executes; deciding *whether* to sync (policy, trigger,
/// coalescing) is the application controller's concern.
pub struct SyncEngine {
    target: DynTarget,
    ordering: KindOrdering,
    retry: RetryPolicy,
    worker_limit: usize,
    call_timeout: Duration,
}

impl SyncEngine {
    /// Creates a sync engine over a shared target handle.
    #[must_use]
    pub fn new(
        target: DynTarget,
        ordering: KindOrdering,
        retry: RetryPolicy,
        worker_limit: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            target,
            ordering,
            retry,
            worker_limit: worker_limit.max(1),
            call_timeout,
        }
    }

    /// Runs one sync attempt to a terminal phase.
    ///
    /// Items execute in dependency waves; a failed item marks its
    /// transitive dependents Skipped without blocking independent items.
    /// When `cancel` flips, no new operations are issued; operations
    /// already in flight run to completion and are recorded.
    pub async fn sync(
        &self,
        app: &Application,
        diffs: Vec<Diff>,
        trigger: SyncTrigger,
        cancel: watch::Receiver<bool>,
    ) -> SyncRecord {
        let mut record = SyncRecord::start(trigger);
        info!(
            app = %app.name,
            sync_id = %record.id,
            items = diffs.len(),
            trigger = %trigger,
            "sync started"
        );

        let deps = plan::dependencies(&diffs, &self.ordering);
        let waves = plan::waves(&deps);
        let max_wave = waves.iter().copied().max().unwrap_or(0);

        let semaphore = Arc::new(Semaphore::new(self.worker_limit));
        let mut results: Vec<(usize, OperationRecord)> = Vec::with_capacity(diffs.len());
        let mut blocked: HashSet<usize> = HashSet::new();

        for wave in 0..=max_wave {
            let wave_items: Vec<usize> = (0..diffs.len()).filter(|i| waves[*i] == wave).collect();
            if wave_items.is_empty() {
                continue;
            }

            let mut running = Vec::new();
            for index in wave_items {
                let diff = &diffs[index];

                if let Some(&failed_dep) = deps[index].iter().find(|d| blocked.contains(*d)) {
                    let reason = format!("dependency {} was not applied", diffs[failed_dep].id());
                    warn!(app = %app.name, object = %diff.id(), %reason, "item skipped");
                    results.push((index, skipped_record(diff, reason)));
                    blocked.insert(index);
                    continue;
                }
                if *cancel.borrow() {
                    results.push((index, skipped_record(diff, "sync cancelled".into())));
                    blocked.insert(index);
                    continue;
                }

                let semaphore = semaphore.clone();
                running.push(async move {
                    let _permit = semaphore.acquire().await.expect("semaphore open");
                    let record = self.execute_item(&app.name, diff).await;
                    (index, record)
                });
            }

            for (index, op) in futures_util::future::join_all(running).await {
                if !op.outcome.is_success() {
                    blocked.insert(index);
                }
                results.push((index, op));
            }
        }

        results.sort_by_key(|(index, _)| *index);
        record.operations = results.into_iter().map(|(_, op)| op).collect();
        if *cancel.borrow() {
            record.message = Some("sync cancelled; remaining operations skipped".into());
        }
        record.finish();

        info!(
            app = %app.name,
            sync_id = %record.id,
            phase = %record.phase,
            "sync finished"
        );
        record
    }

    async fn execute_item(&self, application: &str, diff: &Diff) -> OperationRecord {
        debug!(app = %application, object = %diff.id(), action = %diff.action(), "applying item");
        let outcome = self
            .retry
            .run(|attempt| self.apply_once(application, diff, attempt))
            .await;

        let (outcome, retries) = match outcome {
            RetryOutcome::Succeeded { retries, .. } => (OpOutcome::Succeeded, retries),
            RetryOutcome::Exhausted {
                last_error,
                retries,
            } => (
                OpOutcome::Failed {
                    message: format!("retries exhausted: {last_error}"),
                },
                retries,
            ),
            RetryOutcome::Fatal { error, retries } => {
                (OpOutcome::Failed { message: error }, retries)
            }
        };

        OperationRecord {
            object: diff.id().clone(),
            action: diff.action(),
            outcome,
            retries,
            finished_at: OffsetDateTime::now_utc(),
        }
    }

    /// One write attempt for one item. Conflicts refresh the expected
    /// resource version on the next attempt.
    async fn apply_once(&self, application: &str, diff: &Diff, attempt: u32) -> Attempt<()> {
        let result = match diff {
            Diff::Add(desired) => with_timeout(
                self.call_timeout,
                "create",
                self.target.create(desired, application),
            )
            .await
            .map(|_| ()),
            Diff::Modify { desired, live, .. } => {
                let expected = if attempt == 0 {
                    Some(live.resource_version.clone())
                } else {
                    match with_timeout(self.call_timeout, "get", self.target.get(&desired.id))
                        .await
                    {
                        Ok(current) => current.map(|obj| obj.resource_version),
                        Err(err) => return classify(err),
                    }
                };
                with_timeout(
                    self.call_timeout,
                    "update",
                    self.target.update(desired, application, expected.as_deref()),
                )
                .await
                .map(|_| ())
            }
            Diff::Remove(live) => {
                with_timeout(self.call_timeout, "delete", self.target.delete(&live.id, None))
                    .await
            }
        };

        match result {
            Ok(()) => Attempt::Success(()),
            Err(err) => classify(err),
        }
    }
}

fn classify(err: TargetError) -> Attempt<()> {
    if err.is_transient() {
        Attempt::Transient(err.to_string())
    } else {
        Attempt::Fatal(err.to_string())
    }
}

fn skipped_record(diff: &Diff, reason: String) -> OperationRecord {
    OperationRecord {
        object: diff.id().clone(),
        action: diff.action(),
        outcome: OpOutcome::Skipped { reason },
        retries: 0,
        finished_at: OffsetDateTime::now_utc(),
    }
}
