use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::geometry::CellRect;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum FieldSizeError {
    #[display("field width must be between 1 and {}, got {_0}", FieldSize::MAX_WIDTH)]
    Width(#[error(not(source))] u8),
    #[display("field height must be between 1 and {}, got {_0}", FieldSize::MAX_HEIGHT)]
    Height(#[error(not(source))] u8),
}

/// Dimensions of a playfield, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFieldSize")]
pub struct FieldSize {
    width: u8,
    height: u8,
}

#[derive(Deserialize)]
struct RawFieldSize {
    width: u8,
    height: u8,
}

impl TryFrom<RawFieldSize> for FieldSize {
    type Error = FieldSizeError;

    fn try_from(raw: RawFieldSize) -> Result<Self, Self::Error> {
        Self::new(raw.width, raw.height)
    }
}

impl Default for FieldSize {
    fn default() -> Self {
        Self {
            width: 24,
            height: 24,
        }
    }
}

impl FieldSize {
    pub const MAX_WIDTH: u8 = 32;
    pub const MAX_HEIGHT: u8 = 64;

    pub fn new(width: u8, height: u8) -> Result<Self, FieldSizeError> {
        if width == 0 || width > Self::MAX_WIDTH {
            return Err(FieldSizeError::Width(width));
        }
        if height == 0 || height > Self::MAX_HEIGHT {
            return Err(FieldSizeError::Height(height));
        }
        Ok(Self { width, height })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width as usize
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height as usize
    }

    /// The whole field as a rectangle.
    #[must_use]
    pub fn bounds(&self) -> CellRect {
        CellRect::new(0, 0, i32::from(self.width), i32::from(self.height))
    }

    const fn full_row(self) -> u32 {
        if self.width as u32 == u32::BITS {
            u32::MAX
        } else {
            (1 << self.width) - 1
        }
    }
}

/// The grid of locked cells.
///
/// Row `y` is stored as a bit set where bit `x` marks an occupied cell; row 0 is the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    size: FieldSize,
    rows: Vec<u32>,
}

impl Serialize for Field {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: "WxH:row,row,..." with one fixed-width hex value per row (e.g., "4x2:0,f")
        let digits = self.size.width().div_ceil(4);
        let mut s = format!("{}x{}:", self.size.width, self.size.height);
        for (i, bits) in self.rows.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            write!(&mut s, "{bits:0digits$x}").map_err(serde::ser::Error::custom)?;
        }
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;

        let s = String::deserialize(deserializer)?;

        let (size_str, rows_str) = s.split_once(':').ok_or_else(|| {
            D::Error::custom(format!("missing ':' in format 'WxH:row,row,...', got '{s}'"))
        })?;
        let (width_str, height_str) = size_str.split_once('x').ok_or_else(|| {
            D::Error::custom(format!("missing 'x' in field size, got '{size_str}'"))
        })?;
        let width = width_str
            .parse::<u8>()
            .map_err(|e| D::Error::custom(format!("invalid field width: {width_str} ({e})")))?;
        let height = height_str
            .parse::<u8>()
            .map_err(|e| D::Error::custom(format!("invalid field height: {height_str} ({e})")))?;
        let size = FieldSize::new(width, height).map_err(D::Error::custom)?;

        let parts: Vec<&str> = rows_str.split(',').collect();
        if parts.len() != size.height() {
            return Err(D::Error::custom(format!(
                "expected {} comma-separated hex rows, got {}",
                size.height(),
                parts.len()
            )));
        }

        let mut rows = Vec::with_capacity(size.height());
        for (i, hex_str) in parts.iter().enumerate() {
            let bits = u32::from_str_radix(hex_str, 16).map_err(|e| {
                D::Error::custom(format!("invalid hex at row {i}: {hex_str} ({e})"))
            })?;
            if bits & !size.full_row() != 0 {
                return Err(D::Error::custom(format!(
                    "row {i} has cells beyond width {width}: {hex_str}"
                )));
            }
            rows.push(bits);
        }

        Ok(Field { size, rows })
    }
}

impl Field {
    #[must_use]
    pub fn new(size: FieldSize) -> Self {
        Self {
            size,
            rows: vec![0; size.height()],
        }
    }

    #[must_use]
    pub fn size(&self) -> FieldSize {
        self.size
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.size.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.size.height()
    }

    /// Returns `true` if the cell at `(x, y)` holds a locked block.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the field.
    #[must_use]
    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        assert!(
            x < self.width() && y < self.height(),
            "cell ({x}, {y}) outside {}x{} field",
            self.width(),
            self.height()
        );
        self.rows[y] & (1 << x) != 0
    }

    /// Occupancy of a cell given in signed coordinates, or `None` outside the field.
    #[must_use]
    pub fn cell(&self, x: i32, y: i32) -> Option<bool> {
        let x = usize::try_from(x).ok().filter(|x| *x < self.width())?;
        let y = usize::try_from(y).ok().filter(|y| *y < self.height())?;
        Some(self.is_occupied(x, y))
    }

    /// Sets or clears a cell.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the field.
    pub fn set(&mut self, x: usize, y: usize, occupied: bool) {
        assert!(
            x < self.width() && y < self.height(),
            "cell ({x}, {y}) outside {}x{} field",
            self.width(),
            self.height()
        );
        if occupied {
            self.rows[y] |= 1 << x;
        } else {
            self.rows[y] &= !(1 << x);
        }
    }

    /// Marks the given cells occupied, ignoring cells outside the field.
    pub fn fill_cells(&mut self, cells: impl IntoIterator<Item = (i32, i32)>) {
        for (x, y) in cells {
            let x = usize::try_from(x).ok().filter(|x| *x < self.width());
            let y = usize::try_from(y).ok().filter(|y| *y < self.height());
            if let (Some(x), Some(y)) = (x, y) {
                self.set(x, y, true);
            }
        }
    }

    #[must_use]
    pub fn is_row_full(&self, y: usize) -> bool {
        self.rows[y] == self.size.full_row()
    }

    /// Removes row `y`: every row above it moves down by one and the top row becomes empty.
    pub fn collapse_row(&mut self, y: usize) {
        self.rows.copy_within(0..y, 1);
        self.rows[0] = 0;
    }

    /// Scans rows from top to bottom and collapses every full one.
    ///
    /// Returns the indices of the removed rows as they were before any shifting, ascending.
    pub fn collapse_full_rows(&mut self) -> Vec<usize> {
        let mut removed = vec![];
        for y in 0..self.height() {
            // Rows above `y` only shift down, so `y` still names the scanned row.
            if self.is_row_full(y) {
                self.collapse_row(y);
                removed.push(y);
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        self.rows.fill(0);
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.rows.iter().map(|r| r.count_ones() as usize).sum()
    }

    /// Builds a field from rows of `#` (occupied) and `.` (empty).
    #[cfg(test)]
    pub(crate) fn from_ascii(rows: &[&str]) -> Self {
        let width = u8::try_from(rows[0].len()).unwrap();
        let height = u8::try_from(rows.len()).unwrap();
        let mut field = Self::new(FieldSize::new(width, height).unwrap());
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                field.set(x, y, c == '#');
            }
        }
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_size_validation() {
        assert!(FieldSize::new(24, 24).is_ok());
        assert!(FieldSize::new(32, 64).is_ok());
        assert_eq!(FieldSize::new(0, 10), Err(FieldSizeError::Width(0)));
        assert_eq!(FieldSize::new(33, 10), Err(FieldSizeError::Width(33)));
        assert_eq!(FieldSize::new(10, 65), Err(FieldSizeError::Height(65)));
        assert_eq!(FieldSize::default(), FieldSize::new(24, 24).unwrap());
    }

    #[test]
    fn test_field_size_deserialize_validates() {
        let size: FieldSize = serde_json::from_str(r#"{"width":10,"height":20}"#).unwrap();
        assert_eq!((size.width(), size.height()), (10, 20));
        assert!(serde_json::from_str::<FieldSize>(r#"{"width":40,"height":20}"#).is_err());
    }

    #[test]
    fn test_set_and_query() {
        let mut field = Field::new(FieldSize::new(5, 4).unwrap());
        field.set(4, 3, true);
        assert!(field.is_occupied(4, 3));
        assert_eq!(field.cell(4, 3), Some(true));
        assert_eq!(field.cell(0, 0), Some(false));
        assert_eq!(field.cell(5, 0), None);
        assert_eq!(field.cell(0, -1), None);
        field.set(4, 3, false);
        assert_eq!(field.occupied_count(), 0);
    }

    #[test]
    #[should_panic(expected = "outside 5x4 field")]
    fn test_is_occupied_out_of_range_panics() {
        let field = Field::new(FieldSize::new(5, 4).unwrap());
        let _ = field.is_occupied(5, 0);
    }

    #[test]
    fn test_fill_cells_clips() {
        let mut field = Field::new(FieldSize::new(4, 4).unwrap());
        field.fill_cells([(0, -1), (0, 0), (4, 1), (-1, 2), (3, 3)]);
        assert_eq!(field, Field::from_ascii(&["#...", "....", "....", "...#"]));
    }

    #[test]
    fn test_full_width_rows() {
        let mut field = Field::new(FieldSize::new(32, 2).unwrap());
        for x in 0..32 {
            field.set(x, 1, true);
        }
        assert!(field.is_row_full(1));
        assert!(!field.is_row_full(0));
    }

    #[test]
    fn test_collapse_full_rows() {
        let mut field = Field::from_ascii(&[
            "#...", //
            "####", //
            ".#..", //
            "####", //
            "..#.", //
        ]);
        let removed = field.collapse_full_rows();
        assert_eq!(removed, [1, 3]);
        assert_eq!(
            field,
            Field::from_ascii(&[
                "....", //
                "....", //
                "#...", //
                ".#..", //
                "..#.", //
            ])
        );
    }

    #[test]
    fn test_collapse_adjacent_full_rows() {
        let mut field = Field::from_ascii(&["..#.", "####", "####", "#..."]);
        assert_eq!(field.collapse_full_rows(), [1, 2]);
        assert_eq!(field, Field::from_ascii(&["....", "....", "..#.", "#..."]));
    }

    #[test]
    fn test_field_serialization() {
        let field = Field::from_ascii(&["#.....", "......", "######"]);
        let serialized = serde_json::to_string(&field).unwrap();
        assert_eq!(serialized, "\"6x3:01,00,3f\"");
        let deserialized: Field = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, field);
    }

    #[test]
    fn test_field_deserialization_error_cases() {
        assert!(serde_json::from_str::<Field>("\"6x3 01,00,3f\"").is_err());
        assert!(serde_json::from_str::<Field>("\"6:01,00,3f\"").is_err());
        assert!(serde_json::from_str::<Field>("\"6x2:01,00,3f\"").is_err());
        assert!(serde_json::from_str::<Field>("\"6x3:01,zz,3f\"").is_err());
        // Bit beyond the field width
        assert!(serde_json::from_str::<Field>("\"6x3:01,40,3f\"").is_err());
        assert!(serde_json::from_str::<Field>("\"0x3:0,0,0\"").is_err());
    }
}
