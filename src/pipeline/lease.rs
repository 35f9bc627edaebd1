use std::collections::HashSet;
use std::sync::Mutex;

/// Per-record mutual exclusion for pipeline runs. A lease is taken when a
/// job is submitted and released by the runner when the job finishes on any
/// path, so two uploads or reprocess requests for the same record cannot
/// race each other's writes.
#[derive(Default)]
pub struct RecordLeases {
    held: Mutex<HashSet<i64>>,
}

impl RecordLeases {
    /// Try to take the lease for a record. Returns false when a job for the
    /// record is already queued or running.
    pub fn try_acquire(&self, record_id: i64) -> bool {
        match self.held.lock() {
            Ok(mut held) => held.insert(record_id),
            Err(_) => false,
        }
    }

    pub fn release(&self, record_id: i64) {
        if let Ok(mut held) = self.held.lock() {
            held.remove(&record_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected_until_release() {
        let leases = RecordLeases::default();

        assert!(leases.try_acquire(42));
        assert!(!leases.try_acquire(42));

        // A different record is unaffected.
        assert!(leases.try_acquire(7));

        leases.release(42);
        assert!(leases.try_acquire(42));
    }
}
