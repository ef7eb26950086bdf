//! Worker loop driving a [`CommandExecutor`](super::CommandExecutor).

use std::sync::Arc;

use super::{BATCH_SIZE, CommandExecutor, FailureFlag, SchedulerCommand, SchedulerState, Shared};

/// Run until stopped, then hand the executor back so the scheduler can be
/// restarted.
pub(super) fn run(
    shared: Arc<Shared>,
    failed: FailureFlag,
    mut executor: Box<dyn CommandExecutor>,
) -> Box<dyn CommandExecutor> {
    let mut batch: Vec<SchedulerCommand> = Vec::with_capacity(BATCH_SIZE);
    while dequeue_batch(&shared, &mut batch) {
        if !run_batch(&shared, &failed, executor.as_mut(), &mut batch) {
            break;
        }
    }
    log::debug!("scheduler: worker exiting");
    executor
}

/// Wait for work and move up to [`BATCH_SIZE`] commands into `batch`.
/// Returns `false` once the queue is empty and a stop was requested.
fn dequeue_batch(shared: &Shared, batch: &mut Vec<SchedulerCommand>) -> bool {
    let mut inner = shared.inner.lock();
    while inner.queue.is_empty() {
        if inner.state == SchedulerState::Stopping {
            return false;
        }
        shared.not_empty.wait(&mut inner);
    }
    while batch.len() < BATCH_SIZE {
        match inner.queue.dequeue() {
            Some(command) => batch.push(command),
            None => break,
        }
    }
    shared.not_full.notify_all();
    true
}

/// Execute `batch` in order. Returns `false` when a stop is pending and the
/// transport has failed, after discarding everything still queued.
fn run_batch(
    shared: &Shared,
    failed: &FailureFlag,
    executor: &mut dyn CommandExecutor,
    batch: &mut Vec<SchedulerCommand>,
) -> bool {
    for command in batch.drain(..) {
        executor.execute(command);
        if failed.is_set() && stop_requested(shared) {
            let mut inner = shared.inner.lock();
            let discarded = inner.queue.len();
            inner.queue.clear();
            shared.not_full.notify_all();
            log::warn!(
                "scheduler: transport failed during shutdown; discarded {discarded} queued commands"
            );
            return false;
        }
    }
    true
}

fn stop_requested(shared: &Shared) -> bool {
    shared.inner.lock().state == SchedulerState::Stopping
}
