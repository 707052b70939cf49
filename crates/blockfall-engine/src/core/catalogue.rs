use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};

/// Enum representing the type of piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
pub enum PieceKind {
    /// I-piece.
    I = 0,
    /// O-piece.
    O = 1,
    /// S-piece.
    S = 2,
    /// Z-piece.
    Z = 3,
    /// J-piece.
    J = 4,
    /// L-piece.
    L = 5,
    /// T-piece.
    T = 6,
}

impl Distribution<PieceKind> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceKind {
        match rng.random_range(0..PieceKind::LEN) {
            0 => PieceKind::I,
            1 => PieceKind::O,
            2 => PieceKind::S,
            3 => PieceKind::Z,
            4 => PieceKind::J,
            5 => PieceKind::L,
            _ => PieceKind::T,
        }
    }
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    /// All piece types in catalogue order.
    pub const ALL: [PieceKind; Self::LEN] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
        PieceKind::T,
    ];

    /// Returns the piece type stored at `index` in the catalogue.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::LEN {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Position of this piece type in the catalogue.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of distinct rotation states of this piece.
    #[must_use]
    pub fn rotation_count(self) -> usize {
        CATALOGUE[self as usize].len()
    }

    /// Returns the occupancy mask of the given rotation state.
    ///
    /// # Panics
    ///
    /// Panics if `rotation >= self.rotation_count()`.
    #[must_use]
    pub fn mask(self, rotation: usize) -> &'static RotationMask {
        &CATALOGUE[self as usize][rotation]
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use blockfall_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::I.as_char(), 'I');
    /// assert_eq!(PieceKind::T.as_char(), 'T');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
            PieceKind::T => 'T',
        }
    }

    /// Parses a piece kind from a single character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::I),
            'O' => Some(PieceKind::O),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            'T' => Some(PieceKind::T),
            _ => None,
        }
    }
}

/// Number of piece types in the catalogue.
#[must_use]
pub const fn piece_count() -> usize {
    PieceKind::LEN
}

/// Number of rotation states of `kind`.
#[must_use]
pub fn rotation_count(kind: PieceKind) -> usize {
    kind.rotation_count()
}

/// Occupancy mask of `kind` in the given rotation state.
///
/// # Panics
///
/// Panics if `rotation >= rotation_count(kind)`.
#[must_use]
pub fn rotation_mask(kind: PieceKind, rotation: usize) -> &'static RotationMask {
    kind.mask(rotation)
}

/// Occupancy of a piece in one rotation state, within its own bounding box.
///
/// Row `dy` is stored as a bit set where bit `dx` marks an occupied cell.
/// Bounding boxes keep their empty margins, so two masks of the same piece
/// may have different sizes and different empty columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationMask {
    width: u8,
    height: u8,
    rows: [u8; RotationMask::MAX_SIDE],
}

impl RotationMask {
    /// Largest width or height of any mask.
    pub const MAX_SIDE: usize = 4;

    /// Builds a mask from row strings where `#` is occupied and `.` is empty.
    #[expect(clippy::cast_possible_truncation)]
    const fn parse(rows: &[&str]) -> Self {
        assert!(!rows.is_empty() && rows.len() <= Self::MAX_SIDE);
        let width = rows[0].len();
        assert!(width > 0 && width <= Self::MAX_SIDE);

        let mut bits = [0; Self::MAX_SIDE];
        let mut occupied = false;
        let mut y = 0;
        while y < rows.len() {
            let row = rows[y].as_bytes();
            assert!(row.len() == width, "mask rows must have equal width");
            let mut x = 0;
            while x < width {
                match row[x] {
                    b'#' => {
                        bits[y] |= 1 << x;
                        occupied = true;
                    }
                    b'.' => {}
                    _ => panic!("mask rows may only contain '#' and '.'"),
                }
                x += 1;
            }
            y += 1;
        }
        assert!(occupied, "mask must occupy at least one cell");

        Self {
            width: width as u8,
            height: rows.len() as u8,
            rows: bits,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u8 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u8 {
        self.height
    }

    /// Returns `true` if the cell at `(dx, dy)` inside the bounding box is occupied.
    ///
    /// Cells outside the bounding box are reported as empty.
    #[must_use]
    pub const fn is_occupied(&self, dx: u8, dy: u8) -> bool {
        dx < self.width && dy < self.height && (self.rows[dy as usize] & (1 << dx)) != 0
    }

    /// Iterates over occupied cells as `(dx, dy)` offsets, row by row.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (u8, u8)> {
        let mask = *self;
        (0..mask.height).flat_map(move |dy| {
            (0..mask.width)
                .filter(move |&dx| mask.is_occupied(dx, dy))
                .map(move |dx| (dx, dy))
        })
    }

    /// Leftmost column holding an occupied cell.
    #[must_use]
    pub fn leftmost_column(&self) -> u8 {
        self.occupied_cells().map(|(dx, _)| dx).min().unwrap_or(0)
    }

    /// Rightmost column holding an occupied cell.
    #[must_use]
    pub fn rightmost_column(&self) -> u8 {
        self.occupied_cells().map(|(dx, _)| dx).max().unwrap_or(0)
    }

    /// Bottom-most row holding an occupied cell.
    #[must_use]
    pub fn bottom_row(&self) -> u8 {
        self.occupied_cells().map(|(_, dy)| dy).max().unwrap_or(0)
    }
}

// Rotation states are listed clockwise: state `r + 1` is state `r` turned a quarter to the right.
const I_MASKS: [RotationMask; 2] = [
    RotationMask::parse(&["....", "####"]),
    RotationMask::parse(&[".#", ".#", ".#", ".#"]),
];
const O_MASKS: [RotationMask; 1] = [RotationMask::parse(&["##", "##"])];
const S_MASKS: [RotationMask; 2] = [
    RotationMask::parse(&[".##", "##."]),
    RotationMask::parse(&["#.", "##", ".#"]),
];
const Z_MASKS: [RotationMask; 2] = [
    RotationMask::parse(&["##.", ".##"]),
    RotationMask::parse(&[".#", "##", "#."]),
];
const J_MASKS: [RotationMask; 4] = [
    RotationMask::parse(&["#..", "###"]),
    RotationMask::parse(&[".##", ".#.", ".#."]),
    RotationMask::parse(&["...", "###", "..#"]),
    RotationMask::parse(&[".#", ".#", "##"]),
];
const L_MASKS: [RotationMask; 4] = [
    RotationMask::parse(&["..#", "###"]),
    RotationMask::parse(&[".#.", ".#.", ".##"]),
    RotationMask::parse(&["...", "###", "#.."]),
    RotationMask::parse(&["##", ".#", ".#"]),
];
const T_MASKS: [RotationMask; 4] = [
    RotationMask::parse(&[".#.", "###"]),
    RotationMask::parse(&[".#.", ".##", ".#."]),
    RotationMask::parse(&["...", "###", ".#."]),
    RotationMask::parse(&[".#", "##", ".#"]),
];

static CATALOGUE: [&[RotationMask]; PieceKind::LEN] = [
    &I_MASKS, &O_MASKS, &S_MASKS, &Z_MASKS, &J_MASKS, &L_MASKS, &T_MASKS,
];
