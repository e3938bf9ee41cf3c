/// Per-process Lamport counter.
/// Operations that would push the counter past `u64::MAX` fail and leave it untouched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LamportClock {
    value: u64,
}

impl LamportClock {
    /// Returns a new instance of `LamportClock` starting at `0`
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock for a locally originated message and returns the value to stamp it with
    pub fn tick_on_send(&mut self) -> Option<u64> {
        self.value = self.value.checked_add(1)?;
        Some(self.value)
    }

    /// Merges a clock value carried by a received message: `max(local, received) + 1`
    /// # Return
    /// the new local value, `None` if it does not fit in a `u64`
    pub fn observe(&mut self, received: u64) -> Option<u64> {
        self.value = self.value.max(received).checked_add(1)?;
        Some(self.value)
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}
