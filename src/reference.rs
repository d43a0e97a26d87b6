use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// A reference to a BDD node, potentially negated (complement edge).
///
/// The least significant bit stores the negation flag, the remaining bits store the node index.
/// Node index `0` is never handed out, index `1` is the terminal node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Ref(u32);

impl Ref {
    /// The constant `true` function.
    pub const ONE: Self = Self::positive(1);
    /// The constant `false` function.
    pub const ZERO: Self = Self::negative(1);

    pub const fn new(index: u32, negated: bool) -> Self {
        Self((index << 1) | (negated as u32))
    }

    pub const fn positive(index: u32) -> Self {
        Self::new(index, false)
    }

    pub const fn negative(index: u32) -> Self {
        Self::new(index, true)
    }

    /// Return the index of the referenced node.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 >> 1) as usize
    }

    #[inline]
    pub const fn is_negated(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Return the non-negated version of this reference.
    #[inline]
    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }

    /// Return the internal representation of the reference.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}
