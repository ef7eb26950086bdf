use std::collections::VecDeque;

use crate::scheduler::SchedulerCommand;

use super::ITEM_OVERHEAD;

/// FIFO of scheduler commands with selective eviction.
///
/// Nothing is evicted on enqueue. [`SchedulerQueue::trim`] frees space by
/// dropping the oldest write commands while leaving connect, disconnect and
/// dispatch commands in place.
#[derive(Debug, Default)]
pub struct SchedulerQueue {
    items: VecDeque<SchedulerCommand>,
    size: usize,
}

impl SchedulerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, command: SchedulerCommand) {
        self.size += command.size() + ITEM_OVERHEAD;
        self.items.push_back(command);
    }

    pub fn dequeue(&mut self) -> Option<SchedulerCommand> {
        let command = self.items.pop_front()?;
        self.size -= command.size() + ITEM_OVERHEAD;
        Some(command)
    }

    /// Remove write commands from the head until at least `min_bytes` have
    /// been released. Returns `false` when the queue does not hold enough
    /// removable bytes; whatever could be removed is removed regardless.
    pub fn trim(&mut self, min_bytes: usize) -> bool {
        if min_bytes == 0 {
            return true;
        }
        let mut removed = 0;
        self.items.retain(|command| {
            if removed >= min_bytes || !command.is_write() {
                return true;
            }
            removed += command.size() + ITEM_OVERHEAD;
            false
        });
        self.size -= removed;
        removed >= min_bytes
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.size = 0;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchedulerCommand> {
        self.items.iter()
    }
}
