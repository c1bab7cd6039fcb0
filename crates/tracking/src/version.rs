//! Runtime version reporting

use serde::{Deserialize, Serialize};
use std::fmt;

/// Packed runtime library version
///
/// Layout is `0xMMmmpppp`: major in the top byte, minor in the next byte,
/// patch in the low 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuntimeVersion(pub u32);

impl RuntimeVersion {
    /// Pack a version from its components
    pub fn from_parts(major: u8, minor: u8, patch: u16) -> Self {
        Self((u32::from(major) << 24) | (u32::from(minor) << 16) | u32::from(patch))
    }

    pub fn major(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn minor(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn patch(&self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_packing() {
        let v = RuntimeVersion::from_parts(1, 0, 27);
        assert_eq!(v.0, 0x0100_001b);
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 0);
        assert_eq!(v.patch(), 27);
        assert_eq!(v.to_string(), "0x100001b");
    }

    #[test]
    fn test_version_ordering() {
        assert!(RuntimeVersion::from_parts(1, 2, 0) > RuntimeVersion::from_parts(1, 1, 99));
    }
}
