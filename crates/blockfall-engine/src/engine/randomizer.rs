use std::{fmt, fmt::Write as _, str::FromStr};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PieceKind;

/// Seed for deterministic piece selection.
///
/// A 128-bit seed initializing the [`Pcg32`] that picks every spawned piece
/// and its rotation. The same seed and the same inputs give the same game.
///
/// # Example
///
/// ```
/// use blockfall_engine::PieceSeed;
/// use rand::Rng as _;
///
/// let seed: PieceSeed = rand::rng().random();
/// let parsed: PieceSeed = seed.to_string().parse().unwrap();
/// assert_eq!(parsed, seed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceSeed([u8; 16]);

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid seed {input:?}: expected 32 hex digits")]
pub struct ParseSeedError {
    #[error(not(source))]
    input: String,
}

impl fmt::Display for PieceSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl FromStr for PieceSeed {
    type Err = ParseSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSeedError {
            input: s.to_owned(),
        };
        if s.len() != 32 {
            return Err(err());
        }
        let num = u128::from_str_radix(s, 16).map_err(|_| err())?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Serialize for PieceSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut hex_str = String::with_capacity(2 * self.0.len());
        write!(&mut hex_str, "{self}").map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex_str)
    }
}

impl<'de> Deserialize<'de> for PieceSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

impl Distribution<PieceSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PieceSeed(seed)
    }
}

impl PieceSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generator seeded from this seed.
    #[must_use]
    pub fn rng(&self) -> Pcg32 {
        Pcg32::from_seed(self.0)
    }
}

/// Kind and rotation of the piece to spawn after the next lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPiece {
    pub kind: PieceKind,
    pub rotation: u8,
}

impl NextPiece {
    /// # Panics
    ///
    /// Panics if `rotation` is not a rotation state of `kind`.
    #[must_use]
    pub fn new(kind: PieceKind, rotation: u8) -> Self {
        assert!(
            usize::from(rotation) < kind.rotation_count(),
            "{kind:?} has no rotation state {rotation}"
        );
        Self { kind, rotation }
    }

    /// Picks a kind uniformly, then one of that kind's rotation states uniformly.
    #[expect(clippy::cast_possible_truncation)]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let kind: PieceKind = rng.random();
        let rotation = rng.random_range(0..kind.rotation_count()) as u8;
        Self { kind, rotation }
    }
}
