use heapless::Vec;

use crate::error::{ConfigError, Result};

/// Largest supported output queue depth
pub const MAX_FIFO_DEPTH: usize = 64;

/// Overflow / underflow flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatus {
    pub overflow: bool,
    pub underflow: bool,
}

impl QueueStatus {
    fn merge(&mut self, other: QueueStatus) {
        self.overflow |= other.overflow;
        self.underflow |= other.underflow;
    }
}

/// Fixed-capacity circular queue of finished PCM samples.
///
/// Writes to a full queue drop the sample and raise overflow, reads from an empty queue raise
/// underflow. Neither condition disturbs the stored samples.
#[derive(Debug, Clone)]
pub struct OutputQueue {
    slots: Vec<i32, MAX_FIFO_DEPTH>,
    wr: usize,
    rd: usize,
    count: usize,
    /// Latched until `clear_status`
    sticky: QueueStatus,
    overflows: u64,
    underflows: u64,
}

impl OutputQueue {
    pub fn new(depth: usize) -> Result<Self> {
        let mut slots = Vec::new();
        if depth == 0 || slots.resize(depth, 0).is_err() {
            return Err(ConfigError::FifoDepth(depth));
        }
        Ok(Self {
            slots,
            wr: 0,
            rd: 0,
            count: 0,
            sticky: QueueStatus::default(),
            overflows: 0,
            underflows: 0,
        })
    }

    /// Push a sample. If the queue is full the sample is handed back and overflow is raised.
    pub fn enqueue(&mut self, sample: i32) -> core::result::Result<(), i32> {
        if self.is_full() {
            self.note(QueueStatus { overflow: true, underflow: false });
            return Err(sample);
        }
        self.write_slot(sample);
        Ok(())
    }

    /// Pop the oldest sample. `None` raises underflow.
    pub fn dequeue(&mut self) -> Option<i32> {
        if self.is_empty() {
            self.note(QueueStatus { overflow: false, underflow: true });
            return None;
        }
        Some(self.read_slot())
    }

    /// One clock of the queue: at most one write and one read, both judged against the
    /// occupancy at the start of the clock. A write to a full queue overflows even if a read
    /// frees a slot in the same clock, and a read from an empty queue underflows even if a
    /// write fills one.
    pub fn clock(&mut self, write: Option<i32>, read: bool) -> (Option<i32>, QueueStatus) {
        let full = self.is_full();
        let empty = self.is_empty();
        let mut status = QueueStatus::default();

        let taken = if read {
            if empty {
                status.underflow = true;
                None
            } else {
                Some(self.read_slot())
            }
        } else {
            None
        };

        if let Some(sample) = write {
            if full {
                status.overflow = true;
            } else {
                self.write_slot(sample);
            }
        }

        self.note(status);
        (taken, status)
    }

    /// Oldest sample, without removing it
    pub fn front(&self) -> Option<i32> {
        if self.is_empty() {
            None
        } else {
            Some(self.slots[self.rd])
        }
    }

    fn write_slot(&mut self, sample: i32) {
        self.slots[self.wr] = sample;
        self.wr = (self.wr + 1) % self.slots.len();
        self.count += 1;
    }

    fn read_slot(&mut self) -> i32 {
        let sample = self.slots[self.rd];
        self.rd = (self.rd + 1) % self.slots.len();
        self.count -= 1;
        sample
    }

    fn note(&mut self, status: QueueStatus) {
        if status.overflow {
            self.overflows += 1;
        }
        if status.underflow {
            self.underflows += 1;
        }
        self.sticky.merge(status);
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn write_pointer(&self) -> usize {
        self.wr
    }

    pub fn read_pointer(&self) -> usize {
        self.rd
    }

    /// Flags raised since the last `clear_status` or reset
    pub fn status(&self) -> QueueStatus {
        self.sticky
    }

    pub fn clear_status(&mut self) {
        self.sticky = QueueStatus::default();
    }

    /// Samples dropped because the queue was full
    pub fn overflow_count(&self) -> u64 {
        self.overflows
    }

    pub fn underflow_count(&self) -> u64 {
        self.underflows
    }

    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|x| *x = 0);
        self.wr = 0;
        self.rd = 0;
        self.count = 0;
        self.sticky = QueueStatus::default();
        self.overflows = 0;
        self.underflows = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_depth() {
        assert_eq!(OutputQueue::new(0).unwrap_err(), ConfigError::FifoDepth(0));
        assert_eq!(OutputQueue::new(65).unwrap_err(), ConfigError::FifoDepth(65));
        assert_eq!(OutputQueue::new(64).unwrap().capacity(), 64);
    }

    #[test]
    fn fifo_order_across_wrap() {
        let mut q = OutputQueue::new(4).unwrap();
        for round in 0..5 {
            for i in 0..3 {
                q.enqueue(round * 10 + i).unwrap();
            }
            for i in 0..3 {
                assert_eq!(q.dequeue(), Some(round * 10 + i));
            }
        }
        assert!(q.is_empty());
        assert_eq!(q.status(), QueueStatus::default());
    }

    #[test]
    fn overflow_drops_new_sample() {
        let mut q = OutputQueue::new(4).unwrap();
        for i in 0..4 {
            q.enqueue(i).unwrap();
        }
        assert!(q.is_full());
        assert_eq!(q.enqueue(99), Err(99));
        assert!(q.status().overflow);
        assert_eq!(q.overflow_count(), 1);
        assert_eq!(q.len(), 4);
        let drained: std::vec::Vec<i32> = core::iter::from_fn(|| q.dequeue()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
    }

    #[test]
    fn underflow_is_flagged_and_sticky() {
        let mut q = OutputQueue::new(4).unwrap();
        assert_eq!(q.dequeue(), None);
        assert!(q.status().underflow);
        q.enqueue(5).unwrap();
        assert_eq!(q.dequeue(), Some(5));
        assert!(q.status().underflow);
        q.clear_status();
        assert_eq!(q.status(), QueueStatus::default());
        assert_eq!(q.underflow_count(), 1);
    }

    #[test]
    fn clock_uses_start_of_tick_occupancy() {
        let mut q = OutputQueue::new(4).unwrap();
        for i in 0..4 {
            q.enqueue(i).unwrap();
        }
        let (taken, status) = q.clock(Some(7), true);
        assert_eq!(taken, Some(0));
        assert_eq!(status, QueueStatus { overflow: true, underflow: false });
        assert_eq!(q.len(), 3);

        let mut q = OutputQueue::new(4).unwrap();
        let (taken, status) = q.clock(Some(7), true);
        assert_eq!(taken, None);
        assert_eq!(status, QueueStatus { overflow: false, underflow: true });
        assert_eq!(q.front(), Some(7));
    }

    #[test]
    fn reset_clears_pointers_and_flags() {
        let mut q = OutputQueue::new(4).unwrap();
        q.enqueue(1).unwrap();
        q.dequeue();
        q.dequeue();
        q.reset();
        assert_eq!((q.write_pointer(), q.read_pointer(), q.len()), (0, 0, 0));
        assert_eq!(q.status(), QueueStatus::default());
    }
}
