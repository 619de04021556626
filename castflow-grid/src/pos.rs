use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Packed layout used for persisted positions (same as the host world):
// Bits 38..63: X (26 bits)
// Bits 12..37: Z (26 bits)
// Bits 0..11:  Y (12 bits)
// Each field is two's complement and sign-extended on unpack.

const PACKED_X_BITS: u32 = 26;
const PACKED_Z_BITS: u32 = 26;
const PACKED_Y_BITS: u32 = 12;

const X_MASK: i64 = (1 << PACKED_X_BITS) - 1;
const Z_MASK: i64 = (1 << PACKED_Z_BITS) - 1;
const Y_MASK: i64 = (1 << PACKED_Y_BITS) - 1;

const Z_OFFSET: u32 = PACKED_Y_BITS;
const X_OFFSET: u32 = PACKED_Y_BITS + PACKED_Z_BITS;

/// A grid cell. Serialized as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 3]", into = "[i32; 3]")]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The cell `distance` steps away in `dir`.
    pub fn relative(self, dir: Direction, distance: i32) -> Self {
        let (dx, dy, dz) = dir.step();
        self.offset(dx * distance, dy * distance, dz * distance)
    }

    /// Like [`Position::relative`], but `None` past the edge of the `i32` range.
    pub fn checked_relative(self, dir: Direction, distance: i32) -> Option<Self> {
        let (dx, dy, dz) = dir.step();
        Some(Self::new(
            self.x.checked_add(dx.checked_mul(distance)?)?,
            self.y.checked_add(dy.checked_mul(distance)?)?,
            self.z.checked_add(dz.checked_mul(distance)?)?,
        ))
    }

    /// Whether [`Position::as_long`] keeps every coordinate intact.
    pub fn is_packable(self) -> bool {
        fits_bits(self.x, PACKED_X_BITS)
            && fits_bits(self.y, PACKED_Y_BITS)
            && fits_bits(self.z, PACKED_Z_BITS)
    }

    /// Component-wise `other - self`, widened so any two positions subtract.
    pub fn delta_to(self, other: Position) -> (i64, i64, i64) {
        (
            other.x as i64 - self.x as i64,
            other.y as i64 - self.y as i64,
            other.z as i64 - self.z as i64,
        )
    }

    pub fn dist_sqr(self, other: Position) -> f64 {
        let (dx, dy, dz) = self.delta_to(other);
        let (dx, dy, dz) = (dx as f64, dy as f64, dz as f64);
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(self, other: Position) -> f64 {
        self.dist_sqr(other).sqrt()
    }

    pub fn as_long(self) -> i64 {
        ((self.x as i64 & X_MASK) << X_OFFSET)
            | ((self.z as i64 & Z_MASK) << Z_OFFSET)
            | (self.y as i64 & Y_MASK)
    }

    pub fn from_long(packed: i64) -> Self {
        let x = (packed << (64 - X_OFFSET - PACKED_X_BITS)) >> (64 - PACKED_X_BITS);
        let z = (packed << (64 - Z_OFFSET - PACKED_Z_BITS)) >> (64 - PACKED_Z_BITS);
        let y = (packed << (64 - PACKED_Y_BITS)) >> (64 - PACKED_Y_BITS);
        Self::new(x as i32, y as i32, z as i32)
    }
}

fn fits_bits(value: i32, bits: u32) -> bool {
    let half = 1i64 << (bits - 1);
    (-half..half).contains(&(value as i64))
}

impl From<[i32; 3]> for Position {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Position> for [i32; 3] {
    fn from(pos: Position) -> Self {
        [pos.x, pos.y, pos.z]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid position {input:?}: expected `x,y,z`")]
pub struct ParsePositionError {
    input: String,
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePositionError { input: s.to_string() };
        let mut parts = s.split(',').map(|p| p.trim().parse::<i32>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Ok(Self::new(x, y, z)),
            _ => Err(err()),
        }
    }
}

/// Axis directions. Ordinals are persisted and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Unit offset `(dx, dy, dz)`. North is -Z, West is -X.
    pub fn step(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    pub fn from_delta(dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.step() == (dx, dy, dz))
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::North => "north",
            Direction::South => "south",
            Direction::West => "west",
            Direction::East => "east",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let coords = [
            (0, 0, 0),
            (1, 1, 1),
            (-1, -1, -1),
            (100, -64, -100),
            (30_000_000, 2047, -30_000_000),
            (-33_554_432, -2048, 33_554_431),
        ];

        for (x, y, z) in coords {
            let pos = Position::new(x, y, z);
            assert_eq!(Position::from_long(pos.as_long()), pos, "Mismatch for {pos}");
        }
    }

    #[test]
    fn test_packed_layout() {
        assert_eq!(Position::new(0, 1, 0).as_long(), 1);
        assert_eq!(Position::new(0, 0, 1).as_long(), 1 << 12);
        assert_eq!(Position::new(1, 0, 0).as_long(), 1 << 38);
    }

    #[test]
    fn test_relative() {
        let origin = Position::new(5, 10, -3);
        assert_eq!(origin.relative(Direction::Down, 4), Position::new(5, 6, -3));
        assert_eq!(origin.relative(Direction::West, 1), Position::new(4, 10, -3));
        assert_eq!(origin.relative(Direction::North, 2), Position::new(5, 10, -5));
    }

    #[test]
    fn test_checked_relative_at_range_edge() {
        let low = Position::new(1, i32::MIN + 3, 0);
        assert_eq!(low.checked_relative(Direction::Down, 3), Some(Position::new(1, i32::MIN, 0)));
        assert_eq!(low.checked_relative(Direction::Down, 4), None);
        assert_eq!(Position::new(i32::MAX, 0, 0).checked_relative(Direction::East, 1), None);
        assert_eq!(
            Position::new(0, 0, 0).checked_relative(Direction::North, 2),
            Some(Position::new(0, 0, -2))
        );
    }

    #[test]
    fn test_packable_range() {
        assert!(Position::new(-33_554_432, -2048, 33_554_431).is_packable());
        assert!(!Position::new(0, 2048, 0).is_packable());
        assert!(!Position::new(0, 3000, 0).is_packable());
        assert!(!Position::new(33_554_432, 0, 0).is_packable());
        assert!(!Position::new(0, 0, i32::MIN).is_packable());
    }

    #[test]
    fn test_direction_round_trip() {
        for dir in Direction::ALL {
            let (dx, dy, dz) = dir.step();
            assert_eq!(Direction::from_delta(dx, dy, dz), Some(dir));
            assert_eq!(Direction::from_ordinal(dir.ordinal()), Some(dir));
        }
        assert_eq!(Direction::from_delta(1, 1, 0), None);
        assert_eq!(Direction::from_ordinal(6), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("1,-2,3".parse(), Ok(Position::new(1, -2, 3)));
        assert_eq!(" 4, 5 ,6".parse(), Ok(Position::new(4, 5, 6)));
        assert!("1,2".parse::<Position>().is_err());
        assert!("1,2,3,4".parse::<Position>().is_err());
        assert!("a,b,c".parse::<Position>().is_err());
    }

    #[test]
    fn test_serde_array_form() {
        let pos: Position = serde_json::from_str("[7, -1, 2]").expect("Should parse");
        assert_eq!(pos, Position::new(7, -1, 2));
        assert_eq!(serde_json::to_string(&pos).expect("Should serialize"), "[7,-1,2]");
    }
}
