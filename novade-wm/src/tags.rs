//! Workspace tag sets.
//!
//! A window is visible on an output when its tag set intersects the output's active
//! tag set. Up to 32 tags are supported.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

use serde::{Deserialize, Serialize};

pub const MAX_TAGS: u32 = 32;

/// A bitmask of workspace tags; bit `n` is tag `n + 1`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(u32);

impl Tags {
    pub const EMPTY: Tags = Tags(0);

    pub const fn from_bits(bits: u32) -> Self {
        Tags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Single tag, numbered from 1. Returns `None` outside `1..=32`.
    pub fn single(tag: u32) -> Option<Self> {
        if tag == 0 || tag > MAX_TAGS {
            return None;
        }
        Some(Tags(1 << (tag - 1)))
    }

    /// All tags below `count`.
    pub fn all(count: u32) -> Self {
        if count >= MAX_TAGS {
            Tags(u32::MAX)
        } else {
            Tags((1u32 << count) - 1)
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: Tags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn contains(self, other: Tags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Restricts the set to the first `count` tags.
    pub fn masked(self, count: u32) -> Self {
        self & Tags::all(count)
    }

    /// Tag numbers (1-based) present in the set.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..MAX_TAGS).filter(move |bit| self.0 & (1 << bit) != 0).map(|bit| bit + 1)
    }
}

impl BitAnd for Tags {
    type Output = Tags;
    fn bitand(self, rhs: Tags) -> Tags {
        Tags(self.0 & rhs.0)
    }
}

impl BitOr for Tags {
    type Output = Tags;
    fn bitor(self, rhs: Tags) -> Tags {
        Tags(self.0 | rhs.0)
    }
}

impl BitXor for Tags {
    type Output = Tags;
    fn bitxor(self, rhs: Tags) -> Tags {
        Tags(self.0 ^ rhs.0)
    }
}

impl Not for Tags {
    type Output = Tags;
    fn not(self) -> Tags {
        Tags(!self.0)
    }
}

impl fmt::Debug for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tags(")?;
        let mut first = true;
        for tag in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{tag}")?;
            first = false;
        }
        write!(f, ")")
    }
}
