//! Round-robin stage arbitration.
//!
//! Rename, dispatch, and commit share a per-cycle width across the threads of a
//! core. Each call offers one slot to the next thread in rotation; a thread that
//! cannot use its slot reports `Step::Stall` and is skipped for the rest of the
//! cycle. The rotation start advances by one thread every cycle.

/// Outcome of offering a slot to one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The slot was consumed.
    Progress,
    /// The participant cannot make progress this cycle.
    Stall,
}

/// Rotating start pointer.
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    next: usize,
}

impl RoundRobin {
    /// Creates a rotation starting at participant 0.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Offers up to `width` slots across `len` participants.
    ///
    /// # Arguments
    ///
    /// * `len` - Number of participants.
    /// * `width` - Slots available this cycle.
    /// * `step` - Attempts one unit of work for participant `i`.
    ///
    /// # Returns
    ///
    /// The number of slots consumed, or the first error raised by `step`.
    pub fn run<E>(
        &mut self,
        len: usize,
        width: usize,
        mut step: impl FnMut(usize) -> Result<Step, E>,
    ) -> Result<usize, E> {
        if len == 0 {
            return Ok(0);
        }
        let mut stalled = vec![false; len];
        let mut active = len;
        let mut used = 0;
        let mut i = self.next % len;
        while used < width && active > 0 {
            if !stalled[i] {
                match step(i)? {
                    Step::Progress => used += 1,
                    Step::Stall => {
                        stalled[i] = true;
                        active -= 1;
                    }
                }
            }
            i = (i + 1) % len;
        }
        self.next = (self.next + 1) % len;
        Ok(used)
    }
}
