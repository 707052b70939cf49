pub use self::{catalogue::*, field::*, geometry::*, piece::*};

pub(crate) mod catalogue;
pub(crate) mod field;
pub(crate) mod geometry;
pub(crate) mod piece;
