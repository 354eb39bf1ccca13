//! # Entity Identifiers
//!
//! An entity has no record of its own: it is the identifier plus the union
//! of components currently stored under its index.

use std::fmt;

/// Generational entity handle.
///
/// The low 32 bits address a slot in every component storage; the high 32
/// bits hold the slot's generation when the handle was issued. Two handles
/// are equal iff both halves match, so a handle kept across a release never
/// compares equal to the slot's next occupant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Largest index the pool will ever hand out.
    ///
    /// `u32::MAX` is reserved so that [`EntityId::NULL`] never aliases a real id.
    pub const MAX_INDEX: u32 = u32::MAX - 1;

    /// Handle that never refers to a live entity.
    pub const NULL: Self = Self(u64::MAX);

    /// Packs a slot index and its generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation of the slot when this handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Slot index as a `usize`.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.index() as usize
    }

    /// Packed 64-bit form.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Inverse of [`to_bits`](Self::to_bits).
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Whether this is [`NULL`](Self::NULL).
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    #[inline]
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}:{}", self.index(), self.generation())
        }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({self})")
    }
}
