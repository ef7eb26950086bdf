use std::collections::VecDeque;

use crate::packet::Packet;

use super::ITEM_OVERHEAD;

/// FIFO of packets that evicts from the head once its byte total exceeds
/// the configured backlog.
#[derive(Debug, Default)]
pub struct PacketQueue {
    items: VecDeque<Packet>,
    size: usize,
    backlog: usize,
}

impl PacketQueue {
    pub fn new(backlog: usize) -> Self {
        Self {
            items: VecDeque::new(),
            size: 0,
            backlog,
        }
    }

    pub fn backlog(&self) -> usize {
        self.backlog
    }

    /// Change the byte limit, evicting immediately if the queue is now over
    /// it. Returns the number of evicted packets.
    pub fn set_backlog(&mut self, backlog: usize) -> usize {
        self.backlog = backlog;
        self.resize()
    }

    /// Append `packet`, then evict the oldest packets until the total fits
    /// the backlog. A packet larger than the backlog evicts itself. Returns
    /// the number of evicted packets.
    pub fn push(&mut self, packet: Packet) -> usize {
        self.size += packet.size() + ITEM_OVERHEAD;
        self.items.push_back(packet);
        self.resize()
    }

    pub fn pop(&mut self) -> Option<Packet> {
        let packet = self.items.pop_front()?;
        self.size -= packet.size() + ITEM_OVERHEAD;
        Some(packet)
    }

    pub fn clear(&mut self) {
        while self.pop().is_some() {}
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Accounted byte total of all queued packets.
    pub fn size(&self) -> usize {
        self.size
    }

    fn resize(&mut self) -> usize {
        let mut evicted = 0;
        while self.size > self.backlog {
            if self.pop().is_none() {
                break;
            }
            evicted += 1;
        }
        evicted
    }
}
