use std::collections::HashMap;

/// Flags registers that have not been refreshed within a number of polls.
/// Only registers refreshed at least once are tracked.
pub struct Watchdog {
    limit: u64,
    polls: u64,
    last_refresh: HashMap<&'static str, u64>,
}

impl Watchdog {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: limit.max(1),
            polls: 0,
            last_refresh: HashMap::new(),
        }
    }

    /// Mark the start of a polling interval
    pub fn begin_poll(&mut self) {
        self.polls += 1;
    }

    pub fn refresh(&mut self, field: &'static str) {
        self.last_refresh.insert(field, self.polls);
    }

    pub fn is_stale(&self, field: &str) -> bool {
        match self.last_refresh.get(field) {
            Some(last) => self.polls - last >= self.limit,
            None => false,
        }
    }

    pub fn stale_fields(&self) -> Vec<&'static str> {
        let mut stale: Vec<&'static str> = self
            .last_refresh
            .iter()
            .filter(|(_, last)| self.polls - **last >= self.limit)
            .map(|(field, _)| *field)
            .collect();
        stale.sort_unstable();
        stale
    }
}

#[cfg(test)]
mod watchdog_tests {
    use super::*;

    #[test]
    fn test_stale_after_limit() {
        let mut dog = Watchdog::new(3);
        dog.begin_poll();
        dog.refresh("altitude");
        dog.refresh("apoapsis");

        for _ in 0..2 {
            dog.begin_poll();
            dog.refresh("apoapsis");
            assert!(!dog.is_stale("altitude"));
        }

        dog.begin_poll();
        dog.refresh("apoapsis");
        assert!(dog.is_stale("altitude"));
        assert_eq!(dog.stale_fields(), vec!["altitude"]);

        dog.refresh("altitude");
        assert!(dog.stale_fields().is_empty());
    }

    #[test]
    fn test_untracked_never_stale() {
        let mut dog = Watchdog::new(3);
        for _ in 0..10 {
            dog.begin_poll();
        }
        assert!(!dog.is_stale("periapsis"));
    }
}
