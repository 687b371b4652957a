//! Column type tags

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a column or value
///
/// The discriminant is the tag stored in the low 7 bits of every column's
/// flag byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Boolean = 1,
    TinyInt = 2,
    SmallInt = 3,
    Integer = 4,
    BigInt = 5,
    Real = 6,
    Double = 7,
    Int128 = 8,
    Varchar = 9,
    Array = 10,
    Map = 11,
    Struct = 12,
}

impl Kind {
    /// Convert from tag byte
    #[inline]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Boolean),
            2 => Some(Self::TinyInt),
            3 => Some(Self::SmallInt),
            4 => Some(Self::Integer),
            5 => Some(Self::BigInt),
            6 => Some(Self::Real),
            7 => Some(Self::Double),
            8 => Some(Self::Int128),
            9 => Some(Self::Varchar),
            10 => Some(Self::Array),
            11 => Some(Self::Map),
            12 => Some(Self::Struct),
            _ => None,
        }
    }

    /// Tag byte
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Fixed-width primitive (stored entirely inline)
    #[inline]
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::TinyInt
                | Self::SmallInt
                | Self::Integer
                | Self::BigInt
                | Self::Real
                | Self::Double
                | Self::Int128
        )
    }

    /// Integral primitive
    #[inline]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Integer | Self::BigInt | Self::Int128
        )
    }

    /// Floating point primitive
    #[inline]
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Real | Self::Double)
    }

    /// Bytes a non-null value of this kind occupies inline.
    ///
    /// VARCHAR and ARRAY store an 8-byte reference; MAP and STRUCT are not
    /// storable.
    pub fn width(self) -> Result<usize> {
        match self {
            Self::Boolean | Self::TinyInt => Ok(1),
            Self::SmallInt => Ok(2),
            Self::Integer | Self::Real => Ok(4),
            Self::BigInt | Self::Double => Ok(8),
            Self::Int128 => Ok(16),
            Self::Varchar | Self::Array => Ok(8),
            Self::Map | Self::Struct => Err(Error::UnsupportedType(self.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Int128 => "INT128",
            Self::Varchar => "VARCHAR",
            Self::Array => "ARRAY",
            Self::Map => "MAP",
            Self::Struct => "STRUCT",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for tag in 1..=12u8 {
            let kind = Kind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(Kind::from_tag(0), None);
        assert_eq!(Kind::from_tag(13), None);
        assert_eq!(Kind::from_tag(0x85), None);
    }

    #[test]
    fn test_widths() -> Result<()> {
        assert_eq!(Kind::Boolean.width()?, 1);
        assert_eq!(Kind::SmallInt.width()?, 2);
        assert_eq!(Kind::Real.width()?, 4);
        assert_eq!(Kind::BigInt.width()?, 8);
        assert_eq!(Kind::Int128.width()?, 16);
        assert_eq!(Kind::Varchar.width()?, 8);
        assert_eq!(Kind::Array.width()?, 8);
        assert!(matches!(Kind::Map.width(), Err(Error::UnsupportedType(_))));
        assert!(matches!(Kind::Struct.width(), Err(Error::UnsupportedType(_))));
        Ok(())
    }

    #[test]
    fn test_classification() {
        assert!(Kind::Double.is_primitive());
        assert!(!Kind::Varchar.is_primitive());
        assert!(Kind::Int128.is_integral());
        assert!(Kind::Real.is_floating());
        assert!(!Kind::Boolean.is_integral());
    }
}
