//! Bounded per-typeflow observation record.
//!
//! Each typeflow remembers up to [`SATURATION_CUTOFF`] distinct observed
//! types, each with the hop distance at which it first arrived. Once the
//! capacity is exceeded the record *saturates*: it stops tracking individual
//! types and from then on logically stands for "every instantiated type that
//! passes my filter" (see the saturation side-channel in the engine).
//!
//! The record is exactly one cache line. Within a single engine run it is
//! monotone: types and the saturation mark are only ever added.

use causq_model::TypeId;

/// Capacity of the per-typeflow history. 20 slots of `(u16, u8)` plus the
/// saturation byte pad the record to 64 bytes.
pub const SATURATION_CUTOFF: usize = 20;

const EMPTY_SLOT: u16 = u16::MAX;
const NO_DIST: u8 = u8::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(align(64))]
pub struct TypeflowHistory {
    types: [u16; SATURATION_CUTOFF],
    dists: [u8; SATURATION_CUTOFF],
    saturated_dist: u8,
}

const _: () = assert!(size_of::<TypeflowHistory>() == 64);

impl TypeflowHistory {
    pub const fn new() -> Self {
        TypeflowHistory {
            types: [EMPTY_SLOT; SATURATION_CUTOFF],
            dists: [NO_DIST; SATURATION_CUTOFF],
            saturated_dist: NO_DIST,
        }
    }

    /// Record `ty` at hop distance `dist`. Returns whether the record
    /// changed: a new slot was taken, or the capacity overflowed and the
    /// record saturated.
    pub fn add_type(&mut self, ty: TypeId, dist: u8) -> bool {
        for i in 0..SATURATION_CUTOFF {
            if self.types[i] == EMPTY_SLOT {
                self.types[i] = ty.0;
                self.dists[i] = dist;
                return true;
            } else if self.types[i] == ty.0 {
                return false;
            }
        }
        self.saturated_dist = dist;
        true
    }

    /// Iterate the individually recorded `(type, dist)` pairs, in insertion
    /// order. Saturated records still expose the pairs recorded before the
    /// overflow.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, u8)> + '_ {
        self.types
            .iter()
            .zip(self.dists.iter())
            .take_while(|&(&t, _)| t != EMPTY_SLOT)
            .map(|(&t, &d)| (TypeId(t), d))
    }

    #[inline]
    pub const fn is_saturated(&self) -> bool {
        self.saturated_dist != NO_DIST
    }

    #[inline]
    pub const fn saturated_dist(&self) -> Option<u8> {
        if self.is_saturated() {
            Some(self.saturated_dist)
        } else {
            None
        }
    }

    /// Whether this record has anything to contribute: at least one stored
    /// type. (Saturation implies the first slot is occupied.)
    #[inline]
    pub const fn any(&self) -> bool {
        self.types[0] != EMPTY_SLOT
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn contains(&self, ty: TypeId) -> bool {
        self.iter().any(|(t, _)| t == ty)
    }
}

impl Default for TypeflowHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-method reachability record: the hop distance at which the method was
/// first reached, or unreached. One byte; distances cap at 254.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodHistory(u8);

/// Largest representable hop distance.
pub const DIST_CAP: u8 = u8::MAX - 1;

impl MethodHistory {
    pub const UNREACHED: MethodHistory = MethodHistory(u8::MAX);

    #[inline]
    pub const fn at(dist: u8) -> Self {
        MethodHistory(dist)
    }

    #[inline]
    pub const fn is_reached(self) -> bool {
        self.0 != u8::MAX
    }

    #[inline]
    pub const fn distance(self) -> Option<u8> {
        if self.is_reached() { Some(self.0) } else { None }
    }

    /// Raw byte; `u8::MAX` means unreached. Useful for ordered comparisons
    /// where unreached must sort after every real distance.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl Default for MethodHistory {
    fn default() -> Self {
        MethodHistory::UNREACHED
    }
}

#[cfg(test)]
#[path = "../tests/history.rs"]
mod tests;
