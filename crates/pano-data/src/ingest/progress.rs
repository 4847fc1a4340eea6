/// Percent-complete tracker driven by compressed bytes received
///
/// Reported values never decrease and stay below 100 until [`finish`] is
/// called, even when the advertised total is smaller than what arrives.
///
/// [`finish`]: ProgressTracker::finish
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    received: u64,
    last: u8,
}

impl ProgressTracker {
    /// Track against `total` compressed bytes; zero means unknown
    pub fn new(total: u64) -> Self {
        Self {
            total,
            received: 0,
            last: 0,
        }
    }

    /// Record `bytes` more received and return the current percentage
    pub fn advance(&mut self, bytes: u64) -> u8 {
        self.received = self.received.saturating_add(bytes);
        if self.total > 0 {
            let percent = (self.received.saturating_mul(100) / self.total).min(99) as u8;
            self.last = self.last.max(percent);
        }
        self.last
    }

    /// Mark the sequence exhausted
    pub fn finish(&mut self) -> u8 {
        self.last = 100;
        self.last
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Last reported percentage
    pub fn percent(&self) -> u8 {
        self.last
    }
}
