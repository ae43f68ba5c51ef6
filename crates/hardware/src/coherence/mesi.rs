//! MESI block states.

use serde::Serialize;

/// Coherence state of a cached block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum MesiState {
    /// Dirty and exclusive.
    Modified,
    /// Clean and exclusive.
    Exclusive,
    /// Clean, possibly held elsewhere.
    Shared,
    /// Not present.
    #[default]
    Invalid,
}

impl MesiState {
    /// A load can be served without asking the next level.
    pub const fn is_read_hit(self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// A store can be served without asking the next level.
    pub const fn is_write_hit(self) -> bool {
        matches!(self, Self::Modified | Self::Exclusive)
    }

    /// The block holds data.
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}
