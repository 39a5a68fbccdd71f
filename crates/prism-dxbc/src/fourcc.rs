use core::fmt;

/// A four-byte chunk identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Container magic.
    pub const DXBC: FourCC = FourCC(*b"DXBC");
    /// Resource definitions (SM4+ reflection).
    pub const RDEF: FourCC = FourCC(*b"RDEF");
    /// Legacy constant table (SM1-3 reflection).
    pub const CTAB: FourCC = FourCC(*b"CTAB");
    /// SM4 shader bytecode.
    pub const SHDR: FourCC = FourCC(*b"SHDR");
    /// SM5 shader bytecode.
    pub const SHEX: FourCC = FourCC(*b"SHEX");
    /// Input signature.
    pub const ISGN: FourCC = FourCC(*b"ISGN");
    /// Shader debug info.
    pub const SDBG: FourCC = FourCC(*b"SDBG");
    /// Shader PDB path.
    pub const SPDB: FourCC = FourCC(*b"SPDB");
    /// Compile statistics.
    pub const STAT: FourCC = FourCC(*b"STAT");
    /// Private data appended by tooling.
    pub const PRIV: FourCC = FourCC(*b"PRIV");
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}
