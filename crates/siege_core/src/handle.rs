//! Generational unit handles.
//!
//! Units are pooled and reused, so a plain index would go stale the moment
//! a slot is recycled: the old occupant dies, a new unit moves in, and any
//! subsystem still holding the index would silently act on the wrong unit.
//! A handle therefore carries the slot's generation; storage bumps the
//! generation on every removal, and lookups with a stale generation read
//! as absent. Holding a handle never keeps a unit alive.

use serde::{Deserialize, Serialize};

/// Weak reference to a unit slot.
///
/// Resolving a handle against [`UnitStorage`](crate::battle::UnitStorage)
/// yields the unit only while the slot's generation still matches. Every
/// use site revalidates; none assume liveness across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitHandle {
    /// Slot index within unit storage.
    index: u32,
    /// Generation of the slot at the time the handle was issued.
    generation: u32,
}

impl UnitHandle {
    /// Create a handle from raw parts. Storage is the only intended caller.
    #[must_use]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation this handle was issued for.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
