use serde::{Deserialize, Serialize};

use super::{
    catalogue::{PieceKind, RotationMask},
    geometry::CellRect,
};

/// The active piece: a catalogue shape in one rotation state, anchored at the
/// top-left corner of its bounding box.
///
/// Pieces are immutable values. Movement and rotation return new `Piece`s and
/// leave validation to the playfield.
///
/// # Example
///
/// ```
/// use blockfall_engine::{Piece, PieceKind};
///
/// let piece = Piece::new(PieceKind::T, 0, 4, -1);
/// let moved = piece.shifted(1, 0).map(|p| p.rotated(1));
/// assert_eq!(moved.map(|p| (p.x(), p.rotation())), Some((5, 1)));
/// assert_eq!(piece.shifted(i32::MAX, 0), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    kind: PieceKind,
    rotation: u8,
    x: i32,
    y: i32,
}

impl Serialize for Piece {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: "kind#rotation@x,y" (e.g., "T#3@10,-2")
        let s = format!(
            "{}#{}@{},{}",
            self.kind.as_char(),
            self.rotation,
            self.x,
            self.y
        );
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for Piece {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;

        let s = String::deserialize(deserializer)?;

        let (kind_str, rest) = s.split_once('#').ok_or_else(|| {
            D::Error::custom(format!(
                "missing '#' in format 'kind#rotation@x,y', got '{s}'"
            ))
        })?;
        let mut kind_chars = kind_str.chars();
        let kind = match (kind_chars.next(), kind_chars.next()) {
            (Some(c), None) => PieceKind::from_char(c)
                .ok_or_else(|| D::Error::custom(format!("invalid piece kind: {c}")))?,
            _ => {
                return Err(D::Error::custom(format!(
                    "piece kind must be single character, got '{kind_str}'"
                )));
            }
        };

        let (rotation_str, position_str) = rest.split_once('@').ok_or_else(|| {
            D::Error::custom(format!(
                "missing '@' in format 'kind#rotation@x,y', got '{s}'"
            ))
        })?;
        let rotation = rotation_str.parse::<u8>().map_err(|e| {
            D::Error::custom(format!("invalid rotation: {rotation_str} ({e})"))
        })?;
        if usize::from(rotation) >= kind.rotation_count() {
            return Err(D::Error::custom(format!(
                "rotation of {kind:?} must be below {}, got {rotation}",
                kind.rotation_count()
            )));
        }

        let (x_str, y_str) = position_str.split_once(',').ok_or_else(|| {
            D::Error::custom(format!(
                "missing ',' in format 'kind#rotation@x,y', got '{s}'"
            ))
        })?;
        let x = x_str
            .parse::<i32>()
            .map_err(|e| D::Error::custom(format!("invalid x position: {x_str} ({e})")))?;
        let y = y_str
            .parse::<i32>()
            .map_err(|e| D::Error::custom(format!("invalid y position: {y_str} ({e})")))?;

        Ok(Piece {
            kind,
            rotation,
            x,
            y,
        })
    }
}

impl Piece {
    /// Creates a piece with its bounding box anchored at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `rotation` is not a rotation state of `kind`.
    #[must_use]
    pub fn new(kind: PieceKind, rotation: u8, x: i32, y: i32) -> Self {
        assert!(
            usize::from(rotation) < kind.rotation_count(),
            "{kind:?} has no rotation state {rotation}"
        );
        Self {
            kind,
            rotation,
            x,
            y,
        }
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    #[must_use]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[must_use]
    pub fn mask(&self) -> &'static RotationMask {
        self.kind.mask(usize::from(self.rotation))
    }

    /// Bounding box of the current rotation state, in field coordinates.
    #[must_use]
    pub fn area(&self) -> CellRect {
        let mask = self.mask();
        CellRect::new(
            self.x,
            self.y,
            i32::from(mask.width()),
            i32::from(mask.height()),
        )
    }

    /// Absolute positions of the occupied cells.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.mask()
            .occupied_cells()
            .map(move |(dx, dy)| {
                (
                    self.x.saturating_add(i32::from(dx)),
                    self.y.saturating_add(i32::from(dy)),
                )
            })
    }

    /// Returns `true` if the piece covers the cell at `(x, y)`.
    #[must_use]
    pub fn occupies(&self, x: i32, y: i32) -> bool {
        let dx = x.checked_sub(self.x).and_then(|dx| u8::try_from(dx).ok());
        let dy = y.checked_sub(self.y).and_then(|dy| u8::try_from(dy).ok());
        match (dx, dy) {
            (Some(dx), Some(dy)) => self.mask().is_occupied(dx, dy),
            _ => false,
        }
    }

    /// Moves the origin by `(dx, dy)`, or `None` if the coordinates overflow.
    #[must_use]
    pub fn shifted(&self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            ..*self
        })
    }

    /// Turns the piece by `delta` rotation states, wrapping modulo the piece's rotation count.
    ///
    /// The origin stays put; no offset search is done.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    pub fn rotated(&self, delta: i32) -> Self {
        let count = self.kind.rotation_count() as i32;
        let rotation = (i32::from(self.rotation) + delta.rem_euclid(count)) % count;
        Self {
            rotation: rotation as u8,
            ..*self
        }
    }
}
