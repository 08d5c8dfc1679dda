//! Lower bound of the next query window.

/// Unix seconds passed as `from_date` on the next fetch. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(u64);

impl Watermark {
    /// Start the window at `initial`
    #[must_use]
    pub const fn new(initial: u64) -> Self {
        Self(initial)
    }

    /// Current value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Move to `current_date` if it is ahead. Returns whether the value changed.
    pub fn advance(&mut self, current_date: u64) -> bool {
        if current_date < self.0 {
            tracing::warn!(
                watermark = self.0,
                current_date,
                "api returned a date behind the watermark, keeping the watermark"
            );
            return false;
        }
        let moved = current_date != self.0;
        self.0 = current_date;
        moved
    }
}
