use parking_lot::Mutex;

/// Invocation-local record of side effects produced through capabilities.
///
/// A host context embeds one and has its capabilities `record` what they did,
/// so `Context::compensate` can retract everything as a unit.
#[derive(Debug)]
pub struct Ledger<T> {
    entries: Mutex<Vec<T>>,
}

impl<T> Ledger<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, entry: T) {
        self.entries.lock().push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove and return every entry, oldest first.
    pub fn take(&self) -> Vec<T> {
        core::mem::take(&mut *self.entries.lock())
    }
}

impl<T: Clone> Ledger<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.lock().clone()
    }
}

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains() {
        let ledger = Ledger::new();
        ledger.record("a");
        ledger.record("b");
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.snapshot(), vec!["a", "b"]);
        assert_eq!(ledger.take(), vec!["a", "b"]);
        assert!(ledger.is_empty());
    }
}
