//! `CTAB` chunk parsing.
//!
//! Shader models 1-3 report their constants through a constant table rather
//! than constant-buffer reflection. Each constant names a contiguous range of
//! registers in one of four register sets (bool, int4, float4, sampler).
//!
//! Layout (offsets relative to the chunk payload start):
//!
//! ```text
//! header:    u32 size, u32 creator_offset, u32 version,
//!            u32 constant_count, u32 constant_info_offset,
//!            u32 flags, u32 target_offset                   (28 bytes)
//! constant:  u32 name_offset, u16 register_set, u16 register_index,
//!            u16 register_count, u16 reserved,
//!            u32 type_info_offset, u32 default_value_offset (20 bytes)
//! type info: u16 class, u16 base_type, u16 rows, u16 columns,
//!            u16 elements, u16 struct_members, u32 member_info_offset
//! ```

use crate::container::read_u32;
use crate::error::DxbcError;
use crate::rdef::read_cstr;

const HEADER_LEN: usize = 7 * 4;
const CONSTANT_ENTRY_LEN: usize = 20;

/// The register set a legacy constant lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSet {
    /// `b#` boolean registers (one component each).
    Bool,
    /// `i#` integer registers (four components each).
    Int4,
    /// `c#` float registers (four components each).
    Float4,
    /// `s#` sampler registers.
    Sampler,
}

impl RegisterSet {
    /// Maps a raw register-set code, or `None` for codes outside the table.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(RegisterSet::Bool),
            1 => Some(RegisterSet::Int4),
            2 => Some(RegisterSet::Float4),
            3 => Some(RegisterSet::Sampler),
            _ => None,
        }
    }
}

/// A parsed `CTAB` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantTable {
    /// Compiler identification string, if present.
    pub creator: Option<String>,
    /// Target profile string (e.g. `ps_2_0`), if present.
    pub target: Option<String>,
    /// Constants in table order.
    pub constants: Vec<CtabConstant>,
}

/// One legacy constant-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtabConstant {
    /// Constant name.
    pub name: String,
    /// Raw register-set code; see [`RegisterSet::from_code`].
    pub register_set: u16,
    /// First register of the range.
    pub register_index: u16,
    /// Number of registers in the range.
    pub register_count: u16,
    /// Raw class code, 0 when the entry carries no type info.
    pub class: u16,
    /// Raw base-type code, 0 when the entry carries no type info.
    pub base_type: u16,
    /// Row count from the type info.
    pub rows: u16,
    /// Column count from the type info.
    pub columns: u16,
    /// Array element count from the type info (0 for non-arrays).
    pub elements: u16,
    /// Default-value bytes, empty when the source declares none.
    pub default_value: Vec<u8>,
}

/// Parses a `CTAB` chunk payload.
pub fn parse_ctab_chunk(data: &[u8]) -> Result<ConstantTable, DxbcError> {
    let err = |detail: String| DxbcError::invalid_chunk("CTAB", detail);

    if data.len() < HEADER_LEN {
        return Err(err(format!(
            "chunk is {} bytes, need at least {HEADER_LEN}",
            data.len()
        )));
    }

    let creator_offset = read_u32(data, 4)? as usize;
    let constant_count = read_u32(data, 12)? as usize;
    let constant_info_offset = read_u32(data, 16)? as usize;
    let target_offset = read_u32(data, 24)? as usize;

    let creator = if creator_offset != 0 {
        Some(read_cstr(data, creator_offset).map_err(|e| err(format!("creator string: {e}")))?)
    } else {
        None
    };
    let target = if target_offset != 0 {
        Some(read_cstr(data, target_offset).map_err(|e| err(format!("target string: {e}")))?)
    } else {
        None
    };

    let mut constants = Vec::with_capacity(constant_count);
    for i in 0..constant_count {
        let entry = constant_info_offset
            .checked_add(i * CONSTANT_ENTRY_LEN)
            .filter(|&off| off + CONSTANT_ENTRY_LEN <= data.len())
            .ok_or_else(|| err(format!("constant entry {i} is out of bounds")))?;

        let name_offset = read_u32(data, entry)? as usize;
        let register_set = read_u16(data, entry + 4);
        let register_index = read_u16(data, entry + 6);
        let register_count = read_u16(data, entry + 8);
        let type_info_offset = read_u32(data, entry + 12)? as usize;
        let default_value_offset = read_u32(data, entry + 16)? as usize;

        let name =
            read_cstr(data, name_offset).map_err(|e| err(format!("constant {i} name: {e}")))?;

        let (class, base_type, rows, columns, elements) = if type_info_offset != 0 {
            let end = type_info_offset
                .checked_add(16)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| err(format!("type info of constant {name} is out of bounds")))?;
            let info = &data[type_info_offset..end];
            (
                u16::from_le_bytes([info[0], info[1]]),
                u16::from_le_bytes([info[2], info[3]]),
                u16::from_le_bytes([info[4], info[5]]),
                u16::from_le_bytes([info[6], info[7]]),
                u16::from_le_bytes([info[8], info[9]]),
            )
        } else {
            (0, 0, 0, 0, 0)
        };

        let default_value = if default_value_offset != 0 {
            // Register ranges are reported in 16-byte units in every set that
            // can carry defaults.
            let len = register_count as usize * 16;
            let end = default_value_offset
                .checked_add(len)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| {
                    err(format!("default value of constant {name} is out of bounds"))
                })?;
            data[default_value_offset..end].to_vec()
        } else {
            Vec::new()
        };

        constants.push(CtabConstant {
            name,
            register_set,
            register_index,
            register_count,
            class,
            base_type,
            rows,
            columns,
            elements,
            default_value,
        });
    }

    Ok(ConstantTable {
        creator,
        target,
        constants,
    })
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    // Callers bounds-check the whole entry before field reads.
    u16::from_le_bytes([data[offset], data[offset + 1]])
}
