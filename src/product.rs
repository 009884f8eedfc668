//! Product variant identifiers.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// The product variant of a distribution.
///
/// Some processors are required for one variant only (the remote launcher
/// ships only in the Ultimate distribution), so the variant decides which
/// descriptors go into the completeness set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Product {
    /// The community edition (product code `IC`).
    Community,
    /// The ultimate edition (product code `IU`).
    Ultimate,
}

impl Product {
    /// Returns the two-letter product code used in distribution file names.
    pub fn code(self) -> &'static str {
        match self {
            Product::Community => "IC",
            Product::Ultimate => "IU",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Product {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "IC" | "ic" | "community" => Ok(Product::Community),
            "IU" | "iu" | "ultimate" => Ok(Product::Ultimate),
            _ => Err(Error::UnknownProduct { value: s.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_parse() {
        assert_eq!("IU".parse::<Product>().unwrap(), Product::Ultimate);
        assert_eq!("community".parse::<Product>().unwrap(), Product::Community);
        assert!("XX".parse::<Product>().is_err());
    }

    #[test]
    fn test_product_code() {
        assert_eq!(Product::Community.code(), "IC");
        assert_eq!(Product::Ultimate.code(), "IU");
    }
}
