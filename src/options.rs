use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{CleanerError, Result};

/// Options for cleaning a GPX track.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanOptions {
    /// Keep one point out of every `stride` deduplicated points (default: 1)
    #[serde(default)]
    pub stride: Stride,

    /// Meters added to every present elevation (default: 0, disabled)
    #[serde(default)]
    pub elevation_offset: f64,

    /// How two points without elevation compare during deduplication
    #[serde(default)]
    pub absent_elevation: AbsentElevation,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            stride: Stride::default(),
            elevation_offset: 0.0,
            absent_elevation: AbsentElevation::default(),
        }
    }
}

impl CleanOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.elevation_offset.is_finite() {
            return Err(CleanerError::InvalidElevationOffset(self.elevation_offset));
        }
        Ok(())
    }

    /// Whether the elevation shifter runs at all.
    pub fn shifts_elevation(&self) -> bool {
        self.elevation_offset != 0.0
    }
}

/// Decimation interval. Zero is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Stride(NonZeroUsize);

impl Stride {
    pub const ONE: Stride = Stride(NonZeroUsize::MIN);

    pub fn new(n: usize) -> Result<Self> {
        NonZeroUsize::new(n)
            .map(Stride)
            .ok_or(CleanerError::InvalidStride(n))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    pub fn is_identity(self) -> bool {
        self.get() == 1
    }
}

impl Default for Stride {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<usize> for Stride {
    type Error = CleanerError;

    fn try_from(n: usize) -> Result<Self> {
        Stride::new(n)
    }
}

impl From<Stride> for usize {
    fn from(stride: Stride) -> Self {
        stride.get()
    }
}

impl fmt::Display for Stride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dedup semantics for trackpoints lacking an `<ele>` child.
///
/// A present elevation never equals an absent one; this only decides whether
/// two absent elevations are equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsentElevation {
    /// Two points without elevation compare equal on that field.
    #[default]
    Equal,
    /// A point without elevation is never a duplicate of another point.
    Distinct,
}

impl AbsentElevation {
    pub fn matches(self, a: Option<f64>, b: Option<f64>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self == AbsentElevation::Equal,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_stride_rejected() {
        assert!(matches!(Stride::new(0), Err(CleanerError::InvalidStride(0))));
        assert_eq!(Stride::new(3).unwrap().get(), 3);
        assert!(Stride::default().is_identity());
    }

    #[test]
    fn test_deserialize_defaults() {
        let opts: CleanOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, CleanOptions::default());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let opts: CleanOptions = serde_json::from_str(
            r#"{"stride": 5, "elevationOffset": -2.5, "absentElevation": "distinct"}"#,
        )
        .unwrap();
        assert_eq!(opts.stride.get(), 5);
        assert_eq!(opts.elevation_offset, -2.5);
        assert_eq!(opts.absent_elevation, AbsentElevation::Distinct);
    }

    #[test]
    fn test_deserialize_zero_stride_fails() {
        let result: std::result::Result<CleanOptions, _> =
            serde_json::from_str(r#"{"stride": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_offset() {
        let mut opts = CleanOptions::default();
        assert!(opts.validate().is_ok());
        assert!(!opts.shifts_elevation());

        opts.elevation_offset = f64::NAN;
        assert!(opts.validate().is_err());

        opts.elevation_offset = 20.0;
        assert!(opts.validate().is_ok());
        assert!(opts.shifts_elevation());
    }

    #[test]
    fn test_absent_elevation_policy() {
        assert!(AbsentElevation::Equal.matches(None, None));
        assert!(!AbsentElevation::Distinct.matches(None, None));
        assert!(!AbsentElevation::Equal.matches(Some(1.0), None));
        assert!(!AbsentElevation::Equal.matches(None, Some(1.0)));
        assert!(AbsentElevation::Distinct.matches(Some(1.0), Some(1.0)));
        assert!(!AbsentElevation::Equal.matches(Some(1.0), Some(1.000_000_1)));
    }
}
