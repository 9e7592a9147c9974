//! Die definitions and face intervals.
//!
//! A die definition is a face-count family (d4 through d20). It is shared by
//! every rolling instance of that family and exposes the native `[1, sides]`
//! interval that range modifiers narrow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for die parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid die notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
}

/// Supported die families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
}

impl DieType {
    /// Every supported family, smallest first.
    pub const ALL: [DieType; 6] = [
        DieType::D4,
        DieType::D6,
        DieType::D8,
        DieType::D10,
        DieType::D12,
        DieType::D20,
    ];

    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            _ => None,
        }
    }

    /// Highest face on this die.
    pub fn max_face(&self) -> i32 {
        self.sides() as i32
    }

    /// The native `[1, max_face]` interval before any modifier is applied.
    pub fn native_range(&self) -> FaceRange {
        FaceRange::new(1, self.max_face())
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

impl FromStr for DieType {
    type Err = DiceError;

    /// Accepts `d6`, `D20` or a bare side count such as `8`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let notation = s.trim().to_lowercase();
        let sides_str = notation.strip_prefix('d').unwrap_or(&notation);
        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))
    }
}

/// Face parity required by a parity-forcing modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub fn matches(self, value: i32) -> bool {
        match self {
            Parity::Even => value.rem_euclid(2) == 0,
            Parity::Odd => value.rem_euclid(2) == 1,
        }
    }

    /// Smallest value `>= value` with this parity.
    pub fn round_up(self, value: i32) -> i32 {
        if self.matches(value) {
            value
        } else {
            value.saturating_add(1)
        }
    }

    /// Largest value `<= value` with this parity.
    pub fn round_down(self, value: i32) -> i32 {
        if self.matches(value) {
            value
        } else {
            value.saturating_sub(1)
        }
    }
}

/// An inclusive window of faces, optionally restricted to one parity.
///
/// A range with `min > max` is empty. Empty ranges are a normal outcome of
/// over-constraining modifiers and mean "no legal face exists". When a parity
/// is set, both bounds are kept rounded inward to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceRange {
    pub min: i32,
    pub max: i32,
    #[serde(default)]
    pub parity: Option<Parity>,
}

impl FaceRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max,
            parity: None,
        }
    }

    /// A window holding only faces of `parity`, bounds rounded inward.
    pub fn with_parity(min: i32, max: i32, parity: Parity) -> Self {
        Self {
            min: parity.round_up(min),
            max: parity.round_down(max),
            parity: Some(parity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, value: i32) -> bool {
        !self.is_empty()
            && value >= self.min
            && value <= self.max
            && self.parity.map_or(true, |p| p.matches(value))
    }

    fn step(&self) -> usize {
        if self.parity.is_some() {
            2
        } else {
            1
        }
    }

    /// Number of legal faces (zero for an empty range).
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.max - self.min) as usize / self.step() + 1
        }
    }

    /// The `index`-th legal face in ascending order.
    pub fn nth_face(&self, index: usize) -> Option<i32> {
        self.faces().nth(index)
    }

    /// Narrow this window to its overlap with `other`.
    ///
    /// Two different parities leave no legal face.
    pub fn intersect(self, other: FaceRange) -> FaceRange {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        match (self.parity, other.parity) {
            (None, None) => FaceRange::new(min, max),
            (Some(p), None) | (None, Some(p)) => FaceRange::with_parity(min, max, p),
            (Some(a), Some(b)) if a == b => FaceRange::with_parity(min, max, a),
            (Some(a), Some(_)) => FaceRange {
                min,
                max: min.saturating_sub(1),
                parity: Some(a),
            },
        }
    }

    /// Iterate every legal face in ascending order.
    pub fn faces(&self) -> impl Iterator<Item = i32> {
        (self.min..=self.max).step_by(self.step())
    }
}

impl fmt::Display for FaceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[empty {}..{}]", self.min, self.max);
        }
        match self.parity {
            Some(Parity::Even) => write!(f, "[{}, {}] even", self.min, self.max),
            Some(Parity::Odd) => write!(f, "[{}, {}] odd", self.min, self.max),
            None => write!(f, "[{}, {}]", self.min, self.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notation() {
        assert_eq!("d6".parse::<DieType>().unwrap(), DieType::D6);
        assert_eq!("D20".parse::<DieType>().unwrap(), DieType::D20);
        assert_eq!(" 8 ".parse::<DieType>().unwrap(), DieType::D8);
    }

    #[test]
    fn test_parse_rejects_unknown_sizes() {
        assert_eq!("d7".parse::<DieType>(), Err(DiceError::InvalidDieSize(7)));
        assert_eq!("d100".parse::<DieType>(), Err(DiceError::InvalidDieSize(100)));
        assert!(matches!(
            "dx".parse::<DieType>(),
            Err(DiceError::InvalidNotation(_))
        ));
    }

    #[test]
    fn test_native_range() {
        for die in DieType::ALL {
            let range = die.native_range();
            assert_eq!(range.min, 1);
            assert_eq!(range.max, die.sides() as i32);
            assert_eq!(range.len(), die.sides() as usize);
        }
        assert_eq!(DieType::D12.to_string(), "d12");
    }

    #[test]
    fn test_empty_range() {
        let range = FaceRange::new(5, 3);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);
        assert!(!range.contains(4));
        assert_eq!(range.faces().count(), 0);
    }

    #[test]
    fn test_intersect() {
        let a = FaceRange::new(1, 6);
        assert_eq!(a.intersect(FaceRange::new(3, 10)), FaceRange::new(3, 6));
        assert!(a.intersect(FaceRange::new(7, 9)).is_empty());
    }

    #[test]
    fn test_parity_window() {
        let even = FaceRange::with_parity(3, 7, Parity::Even);
        assert_eq!((even.min, even.max), (4, 6));
        assert_eq!(even.faces().collect::<Vec<_>>(), vec![4, 6]);
        assert_eq!(even.len(), 2);
        assert!(!even.contains(5));
        assert_eq!(even.nth_face(1), Some(6));
        assert_eq!(even.to_string(), "[4, 6] even");

        let narrowed = FaceRange::new(1, 6).intersect(FaceRange::with_parity(1, 6, Parity::Odd));
        assert_eq!(narrowed.faces().collect::<Vec<_>>(), vec![1, 3, 5]);
    }

    #[test]
    fn test_conflicting_parity_is_empty() {
        let even = FaceRange::with_parity(1, 6, Parity::Even);
        let odd = FaceRange::with_parity(1, 6, Parity::Odd);
        assert!(even.intersect(odd).is_empty());
    }
}
