//! Asynchronous command scheduler.
//!
//! A [`Scheduler`] owns one background worker thread, a byte-bounded
//! [`SchedulerQueue`] and the overload policy for a single transport.
//! Producers call [`Scheduler::schedule`]; the worker drains the queue in
//! small batches and hands each command to a [`CommandExecutor`].
//!
//! Two overload policies exist. With throttling enabled and a healthy
//! transport, producers wait until the queue has room. Otherwise the oldest
//! queued writes are evicted so the producer never blocks. A command larger
//! than the whole threshold is rejected outright.

mod command;
mod drop_warner;
mod worker;


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

pub use command::{DispatchCommand, SchedulerAction, SchedulerCommand};

use crate::queue::SchedulerQueue;
use drop_warner::{DropReason, DropWarner};

/// Default queue threshold in bytes.
pub const DEFAULT_THRESHOLD: usize = 2048 * 1024;
/// Maximum number of commands the worker takes per wake-up.
pub const BATCH_SIZE: usize = 16;

/// Executes commands on the worker thread. Implementations must not panic
/// on transport failures; they report them through their own channel.
pub trait CommandExecutor: Send {
    fn execute(&mut self, command: SchedulerCommand);
}

/// Shared "transport is failing" marker, written by the executor and read by
/// producers choosing an overload policy.
#[derive(Clone, Debug, Default)]
pub struct FailureFlag(Arc<AtomicBool>);

impl FailureFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, failed: bool) {
        self.0.store(failed, Ordering::Release);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Byte ceiling for queued commands.
    pub threshold: usize,
    /// Block producers instead of evicting while the transport is healthy.
    pub throttle: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            throttle: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Created,
    Started,
    Stopping,
    Stopped,
}

pub(crate) struct Inner {
    pub(crate) queue: SchedulerQueue,
    pub(crate) state: SchedulerState,
}

pub(crate) struct Shared {
    pub(crate) inner: Mutex<Inner>,
    pub(crate) not_empty: Condvar,
    pub(crate) not_full: Condvar,
}

struct Control {
    executor: Option<Box<dyn CommandExecutor>>,
    handle: Option<JoinHandle<Box<dyn CommandExecutor>>>,
}

/// Background delivery for one transport.
pub struct Scheduler {
    config: SchedulerConfig,
    shared: Arc<Shared>,
    control: Mutex<Control>,
    failed: FailureFlag,
    drops: DropWarner,
}

impl Scheduler {
    /// Create a scheduler that will run `executor` on its worker thread.
    /// Nothing runs until [`Scheduler::start`].
    pub fn new(
        config: SchedulerConfig,
        executor: Box<dyn CommandExecutor>,
        failed: FailureFlag,
    ) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    queue: SchedulerQueue::new(),
                    state: SchedulerState::Created,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
            control: Mutex::new(Control {
                executor: Some(executor),
                handle: None,
            }),
            failed,
            drops: DropWarner::default(),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.inner.lock().state
    }

    /// Number of queued commands not yet picked up by the worker.
    pub fn len(&self) -> usize {
        self.shared.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the worker thread. Calling this while the worker runs is a no-op.
    /// A stopped scheduler can be started again.
    pub fn start(&self) {
        let mut control = self.control.lock();
        if control.handle.is_some() {
            return;
        }
        let Some(executor) = control.executor.take() else {
            log::warn!("scheduler: cannot start, executor was lost");
            return;
        };
        self.shared.inner.lock().state = SchedulerState::Started;
        let shared = Arc::clone(&self.shared);
        let failed = self.failed.clone();
        control.handle = Some(thread::spawn(move || {
            worker::run(shared, failed, executor)
        }));
    }

    /// Request shutdown and wait for the worker to exit.
    ///
    /// The worker drains the remaining queue first, unless the transport
    /// fails while draining, in which case the rest is discarded.
    pub fn stop(&self) {
        let mut control = self.control.lock();
        let Some(handle) = control.handle.take() else {
            return;
        };
        {
            let mut inner = self.shared.inner.lock();
            inner.state = SchedulerState::Stopping;
            self.shared.not_empty.notify_all();
            self.shared.not_full.notify_all();
        }
        match handle.join() {
            Ok(executor) => control.executor = Some(executor),
            Err(_) => log::warn!("scheduler: worker thread panicked"),
        }
        self.shared.inner.lock().state = SchedulerState::Stopped;
        self.drops.flush();
    }

    /// Queue `command` for the worker. Returns `false` when the command was
    /// dropped: the scheduler is not running, or the command alone exceeds
    /// the threshold.
    pub fn schedule(&self, command: SchedulerCommand) -> bool {
        let size = command.size();
        if size > self.config.threshold {
            self.drops.record(DropReason::Oversized, 1);
            return false;
        }

        let mut inner = self.shared.inner.lock();
        if inner.state != SchedulerState::Started {
            drop(inner);
            self.drops.record(DropReason::NotRunning, 1);
            return false;
        }

        while inner.queue.size() + size > self.config.threshold {
            if !self.config.throttle || self.failed.is_set() {
                let before = inner.queue.len();
                inner.queue.trim(size);
                let evicted = before - inner.queue.len();
                self.drops.record(DropReason::Evicted, evicted as u64);
                break;
            }
            self.shared.not_full.wait(&mut inner);
            if inner.state != SchedulerState::Started {
                drop(inner);
                self.drops.record(DropReason::NotRunning, 1);
                return false;
            }
        }

        inner.queue.enqueue(command);
        self.shared.not_empty.notify_one();
        true
    }

    /// Discard every queued command.
    pub fn clear(&self) {
        let mut inner = self.shared.inner.lock();
        inner.queue.clear();
        self.shared.not_full.notify_all();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}
