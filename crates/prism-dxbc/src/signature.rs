//! `ISGN` input-signature parsing.
//!
//! Vertex attributes are recovered from the shader's input signature:
//! semantic name + index per input register. Only the 24-byte entry layout
//! is handled; the 32-byte `ISG1` variant never appears in the shader models
//! this pipeline emits.
//!
//! Layout (offsets relative to the chunk payload start):
//!
//! ```text
//! header: u32 param_count, u32 param_offset
//! entry:  u32 name_offset, u32 semantic_index, u32 system_value_type,
//!         u32 component_type, u32 register,
//!         u8 mask, u8 read_write_mask, u16 padding   (24 bytes)
//! ```

use crate::container::read_u32;
use crate::error::DxbcError;
use crate::rdef::read_cstr;

const HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 24;

/// A parsed input-signature chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSignature {
    /// Signature entries in declaration order.
    pub entries: Vec<SignatureEntry>,
}

/// One input-signature entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    /// Semantic name without its index (`TEXCOORD` for `TEXCOORD1`).
    pub semantic_name: String,
    /// Semantic index.
    pub semantic_index: u32,
    /// Input register assigned by the compiler.
    pub register: u32,
    /// Raw system-value code (0 = none).
    pub system_value_type: u32,
    /// Component presence mask.
    pub mask: u8,
}

/// Parses an `ISGN` chunk payload.
pub fn parse_signature_chunk(data: &[u8]) -> Result<InputSignature, DxbcError> {
    let err = |detail: String| DxbcError::invalid_chunk("ISGN", detail);

    if data.len() < HEADER_LEN {
        return Err(err(format!(
            "chunk is {} bytes, need at least {HEADER_LEN}",
            data.len()
        )));
    }

    let param_count = read_u32(data, 0)? as usize;
    let param_offset = read_u32(data, 4)? as usize;

    let mut entries = Vec::with_capacity(param_count);
    for i in 0..param_count {
        let entry = param_offset
            .checked_add(i * ENTRY_LEN)
            .filter(|&off| off + ENTRY_LEN <= data.len())
            .ok_or_else(|| err(format!("signature entry {i} is out of bounds")))?;

        let name_offset = read_u32(data, entry)? as usize;
        let semantic_name =
            read_cstr(data, name_offset).map_err(|e| err(format!("entry {i} name: {e}")))?;
        let semantic_index = read_u32(data, entry + 4)?;
        let system_value_type = read_u32(data, entry + 8)?;
        let register = read_u32(data, entry + 16)?;
        let mask = (read_u32(data, entry + 20)? & 0xFF) as u8;

        entries.push(SignatureEntry {
            semantic_name,
            semantic_index,
            register,
            system_value_type,
            mask,
        });
    }

    Ok(InputSignature { entries })
}
