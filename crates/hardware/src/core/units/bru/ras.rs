//! Return Address Stack (RAS).
//!
//! A circular stack: pushing past capacity overwrites the oldest entry rather
//! than failing, so deep recursion only loses the outermost return addresses.
//! The top-of-stack index is exposed so a mispredicted path can be rolled back.

/// Return Address Stack structure.
#[derive(Debug, Clone)]
pub struct Ras {
    /// The stack storage.
    stack: Vec<u64>,
    /// Index of the current top entry.
    tos: usize,
}

impl Ras {
    /// Creates a stack with `capacity` entries (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            stack: vec![0; capacity.max(1)],
            tos: 0,
        }
    }

    /// Number of entries.
    pub fn capacity(&self) -> usize {
        self.stack.len()
    }

    /// Current top-of-stack index; always `< capacity()`.
    pub const fn tos(&self) -> usize {
        self.tos
    }

    /// Pushes a return address.
    ///
    /// # Arguments
    ///
    /// * `addr` - The return address to push.
    pub fn push(&mut self, addr: u64) {
        self.tos = (self.tos + 1) % self.stack.len();
        self.stack[self.tos] = addr;
    }

    /// Pops the top return address.
    pub fn pop(&mut self) -> u64 {
        let addr = self.stack[self.tos];
        self.tos = (self.tos + self.stack.len() - 1) % self.stack.len();
        addr
    }

    /// The address a return would use, without popping.
    pub fn top(&self) -> u64 {
        self.stack[self.tos]
    }

    /// Rolls the top-of-stack index back to a saved value.
    pub fn restore(&mut self, tos: usize) {
        self.tos = tos % self.stack.len();
    }
}
