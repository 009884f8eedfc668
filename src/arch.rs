//! CPU architecture identifiers for distribution artifacts.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A CPU architecture a distribution is built for.
///
/// The name is the normalized form used in artifact file names
/// (`idea…-aarch64.tar.gz`, `natives-linux-riscv64.zip`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Arch {
    /// x86-64 (amd64).
    X86_64,
    /// 64-bit ARM, the usual base architecture of vendor distributions.
    Aarch64,
    /// RISC-V 64-bit.
    Riscv64,
    /// LoongArch 64-bit.
    Loongarch64,
}

impl Arch {
    /// Returns the normalized architecture name used in artifact names.
    pub fn name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Riscv64 => "riscv64",
            Arch::Loongarch64 => "loongarch64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x86_64" | "x86-64" | "amd64" => Ok(Arch::X86_64),
            "aarch64" | "arm64" => Ok(Arch::Aarch64),
            "riscv64" => Ok(Arch::Riscv64),
            "loongarch64" => Ok(Arch::Loongarch64),
            _ => Err(Error::UnknownArch { value: s.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_parse_aliases() {
        assert_eq!("arm64".parse::<Arch>().unwrap(), Arch::Aarch64);
        assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("riscv64".parse::<Arch>().unwrap(), Arch::Riscv64);
        assert_eq!("loongarch64".parse::<Arch>().unwrap(), Arch::Loongarch64);
    }

    #[test]
    fn test_arch_parse_rejects_unknown() {
        let err = "sparc".parse::<Arch>().unwrap_err();
        assert!(matches!(err, Error::UnknownArch { value } if value == "sparc"));
    }

    #[test]
    fn test_arch_display_round_trips() {
        for arch in [Arch::X86_64, Arch::Aarch64, Arch::Riscv64, Arch::Loongarch64] {
            assert_eq!(arch.to_string().parse::<Arch>().unwrap(), arch);
        }
    }
}
