//! Byte-bounded FIFO queues.
//!
//! Both queues account every item as its payload size plus a fixed
//! [`ITEM_OVERHEAD`]. Neither queue is synchronised; owners guard them with
//! their own lock.

mod packet_queue;
mod scheduler_queue;


pub use packet_queue::PacketQueue;
pub use scheduler_queue::SchedulerQueue;

/// Bytes charged per queued item on top of its payload size.
pub const ITEM_OVERHEAD: usize = 24;
