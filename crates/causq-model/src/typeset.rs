//! Tagged one-or-many view of a type set.
//!
//! Single-type filters are very common, so the model compresses them into an
//! inline [`TypeId`] instead of pointing at a one-bit bitset. Every operation
//! dispatches on the two forms behind one contract; iteration yields types in
//! ascending id order for both.

use crate::bitset::Bitset;
use crate::ids::TypeId;

#[derive(Clone, Copy, Debug)]
pub enum TypeSet<'a> {
    /// Exactly one type.
    Single(TypeId),
    /// Any number of types, including zero.
    Many(&'a Bitset),
}

impl<'a> TypeSet<'a> {
    /// Compress a bitset: popcount 1 becomes the inline single-type form.
    pub fn from_bitset(set: &'a Bitset) -> Self {
        if set.count() == 1 {
            let first = set.first().expect("popcount 1 bitset has a first bit");
            TypeSet::Single(TypeId(first as u16))
        } else {
            TypeSet::Many(set)
        }
    }

    #[inline]
    pub fn contains(self, t: TypeId) -> bool {
        match self {
            TypeSet::Single(single) => single == t,
            TypeSet::Many(set) => set.contains(t.index()),
        }
    }

    pub fn count(self) -> usize {
        match self {
            TypeSet::Single(_) => 1,
            TypeSet::Many(set) => set.count(),
        }
    }

    pub fn first(self) -> Option<TypeId> {
        match self {
            TypeSet::Single(single) => Some(single),
            TypeSet::Many(set) => set.first().map(|i| TypeId(i as u16)),
        }
    }

    pub fn next_after(self, t: TypeId) -> Option<TypeId> {
        match self {
            TypeSet::Single(_) => None,
            TypeSet::Many(set) => set.next_after(t.index()).map(|i| TypeId(i as u16)),
        }
    }

    /// Whether every member of `other` is a member of `self`.
    pub fn is_superset(self, other: TypeSet<'_>) -> bool {
        match (self, other) {
            (TypeSet::Single(a), TypeSet::Single(b)) => a == b,
            (TypeSet::Single(_), TypeSet::Many(set)) => set.count() == 0,
            (TypeSet::Many(set), TypeSet::Single(b)) => set.contains(b.index()),
            (TypeSet::Many(a), TypeSet::Many(b)) => a.is_superset(b),
        }
    }

    /// Iterate members in ascending id order.
    pub fn iter(self) -> TypeSetIter<'a> {
        TypeSetIter {
            set: self,
            next: self.first(),
        }
    }
}

impl<'a> IntoIterator for TypeSet<'a> {
    type Item = TypeId;
    type IntoIter = TypeSetIter<'a>;

    fn into_iter(self) -> TypeSetIter<'a> {
        self.iter()
    }
}

pub struct TypeSetIter<'a> {
    set: TypeSet<'a>,
    next: Option<TypeId>,
}

impl Iterator for TypeSetIter<'_> {
    type Item = TypeId;

    fn next(&mut self) -> Option<TypeId> {
        let cur = self.next?;
        self.next = self.set.next_after(cur);
        Some(cur)
    }
}

#[cfg(test)]
#[path = "../tests/typeset.rs"]
mod tests;
