use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Last-write-wins gate for asynchronous intent responses.
///
/// Only the response to the most recently issued request is accepted; any
/// completion for an older token is stale and must be discarded.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: u64,
    accepted: u64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> RequestToken {
        self.issued += 1;
        RequestToken(self.issued)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.issued
    }

    /// True exactly once, for the newest token.
    pub fn accept(&mut self, token: RequestToken) -> bool {
        if token.0 != self.issued || token.0 <= self.accepted {
            return false;
        }
        self.accepted = token.0;
        true
    }
}

/// Tracks a burst of keystrokes and reports when it has gone quiet.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_input: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_input: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_input = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_input.is_some()
    }

    /// Returns true once per burst, after `window` has elapsed since the last touch.
    pub fn take_settled(&mut self, now: Instant) -> bool {
        match self.last_input {
            Some(at) if now.saturating_duration_since(at) >= self.window => {
                self.last_input = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_responses_are_discarded() {
        let mut sequencer = RequestSequencer::new();
        let first = sequencer.issue();
        let second = sequencer.issue();

        assert!(!sequencer.accept(first));
        assert!(sequencer.is_current(second));
        assert!(sequencer.accept(second));
        assert!(!sequencer.accept(second));
    }

    #[test]
    fn response_arriving_after_a_newer_request_is_stale() {
        let mut sequencer = RequestSequencer::new();
        let first = sequencer.issue();
        let _second = sequencer.issue();
        assert!(!sequencer.is_current(first));
        assert!(!sequencer.accept(first));
    }

    #[test]
    fn debouncer_settles_once_per_burst() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(250));
        assert!(!debouncer.take_settled(start));

        debouncer.touch(start);
        debouncer.touch(start + Duration::from_millis(100));
        assert!(!debouncer.take_settled(start + Duration::from_millis(300)));
        assert!(debouncer.take_settled(start + Duration::from_millis(350)));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.take_settled(start + Duration::from_millis(900)));
    }
}
