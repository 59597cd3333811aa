//! Board coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Smallest board side on which a rook has a legal move.
pub const MIN_BOARD_SIZE: u8 = 2;

/// A cell address on a square board.
///
/// Valid coordinates satisfy `0 <= x, y < board_size`. [`Coordinate::INVALID`]
/// is a reserved out-of-range value meaning "no coordinate", used for pieces
/// that are not on the board yet and for wait entries that represent a
/// pending placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const INVALID: Coordinate = Coordinate { x: -1, y: -1 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }

    /// Whether this coordinate addresses a cell of a `board_size`×`board_size` board.
    #[inline]
    pub fn in_bounds(self, board_size: u8) -> bool {
        let size = i32::from(board_size);
        (0..size).contains(&self.x) && (0..size).contains(&self.y)
    }

    /// Row-major index into a board of the given size. `None` when out of bounds.
    #[inline]
    pub fn index(self, board_size: u8) -> Option<usize> {
        self.in_bounds(board_size)
            .then(|| (self.y * i32::from(board_size) + self.x) as usize)
    }

    /// Whether `other` lies on the same rank or file, excluding this cell itself.
    #[inline]
    pub fn is_orthogonal_to(self, other: Coordinate) -> bool {
        self != other && (self.x == other.x || self.y == other.y)
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Chess-style rendering: file letter followed by zero-based rank, e.g. `C4`.
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            return f.write_str("--");
        }
        match u8::try_from(self.x).ok().filter(|x| *x < 26) {
            Some(file) => write!(f, "{}{}", char::from(b'A' + file), self.y),
            None => write!(f, "({},{})", self.x, self.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_is_never_in_bounds() {
        assert!(!Coordinate::INVALID.in_bounds(8));
        assert!(Coordinate::INVALID.is_invalid());
        assert_eq!(Coordinate::default(), Coordinate::INVALID);
    }

    #[test]
    fn bounds_are_half_open() {
        assert!(Coordinate::new(0, 0).in_bounds(8));
        assert!(Coordinate::new(7, 7).in_bounds(8));
        assert!(!Coordinate::new(8, 7).in_bounds(8));
        assert!(!Coordinate::new(7, 8).in_bounds(8));
        assert!(!Coordinate::new(3, -1).in_bounds(8));
    }

    #[test]
    fn index_is_row_major() {
        assert_eq!(Coordinate::new(0, 0).index(8), Some(0));
        assert_eq!(Coordinate::new(3, 1).index(8), Some(11));
        assert_eq!(Coordinate::new(8, 0).index(8), None);
    }

    #[test]
    fn orthogonality_excludes_self() {
        let c = Coordinate::new(2, 5);
        assert!(c.is_orthogonal_to(Coordinate::new(2, 0)));
        assert!(c.is_orthogonal_to(Coordinate::new(7, 5)));
        assert!(!c.is_orthogonal_to(c));
        assert!(!c.is_orthogonal_to(Coordinate::new(3, 6)));
    }

    #[test]
    fn display_uses_file_letters() {
        assert_eq!(Coordinate::new(0, 0).to_string(), "A0");
        assert_eq!(Coordinate::new(7, 3).to_string(), "H3");
        assert_eq!(Coordinate::INVALID.to_string(), "--");
    }
}
