//! `RDEF` chunk parsing.
//!
//! Layout (all offsets relative to the chunk payload start):
//!
//! ```text
//! header:    u32 cb_count, u32 cb_offset,
//!            u32 resource_count, u32 resource_offset,
//!            u32 shader_version, u32 flags, u32 creator_offset
//! cbuffer:   u32 name_offset, u32 variable_count, u32 variable_offset,
//!            u32 size, u32 flags, u32 buffer_type          (24 bytes)
//! variable:  u32 name_offset, u32 start_offset, u32 size,
//!            u32 flags, u32 type_offset, u32 default_offset (24 bytes;
//!            SM5 compilers append 16 more bytes per entry)
//! type:      u16 class, u16 base_type, u16 rows, u16 columns,
//!            u16 elements, u16 member_count, u32 member_offset
//! member:    u32 name_offset, u32 type_offset, u32 offset   (12 bytes)
//! resource:  u32 name_offset, u32 input_type, u32 return_type,
//!            u32 dimension, u32 num_samples, u32 bind_point,
//!            u32 bind_count, u32 flags                      (32 bytes)
//! ```
//!
//! Strings are NUL-terminated and live anywhere inside the chunk.

use crate::container::read_u32;
use crate::error::DxbcError;

const HEADER_LEN: usize = 7 * 4;
const CBUFFER_ENTRY_LEN: usize = 24;
const VARIABLE_ENTRY_LEN_SM4: usize = 24;
const VARIABLE_ENTRY_LEN_SM5: usize = 40;
const RESOURCE_ENTRY_LEN: usize = 32;
const MEMBER_ENTRY_LEN: usize = 12;

// Nested struct types reference further type entries by offset; a cycle in a
// hostile chunk must not recurse forever.
const MAX_TYPE_DEPTH: u32 = 8;

/// Shader-variable class codes stored in `RDEF` type entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdefTypeClass {
    /// Single scalar component.
    Scalar,
    /// One row of components.
    Vector,
    /// Row-major matrix.
    MatrixRows,
    /// Column-major matrix.
    MatrixColumns,
    /// Opaque object (texture, sampler, shader).
    Object,
    /// Aggregate with named members.
    Struct,
}

impl RdefTypeClass {
    /// Maps a raw class code to a known class, or `None` for codes this
    /// pipeline does not model.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(RdefTypeClass::Scalar),
            1 => Some(RdefTypeClass::Vector),
            2 => Some(RdefTypeClass::MatrixRows),
            3 => Some(RdefTypeClass::MatrixColumns),
            4 => Some(RdefTypeClass::Object),
            5 => Some(RdefTypeClass::Struct),
            _ => None,
        }
    }
}

/// Raw input-type codes for `RDEF` resource bindings.
pub mod input_type {
    /// Constant buffer (`b#`).
    pub const CBUFFER: u32 = 0;
    /// Texture buffer.
    pub const TBUFFER: u32 = 1;
    /// Shader resource view texture (`t#`).
    pub const TEXTURE: u32 = 2;
    /// Sampler (`s#`).
    pub const SAMPLER: u32 = 3;
    /// Typed UAV (`u#`).
    pub const UAV_RWTYPED: u32 = 4;
    /// Read-only structured buffer.
    pub const STRUCTURED: u32 = 5;
    /// Read-write structured buffer.
    pub const UAV_RWSTRUCTURED: u32 = 6;
    /// Read-only byte-address buffer.
    pub const BYTEADDRESS: u32 = 7;
    /// Read-write byte-address buffer.
    pub const UAV_RWBYTEADDRESS: u32 = 8;
}

/// Raw dimension codes for `RDEF` resource bindings.
pub mod dimension {
    /// No dimensionality (buffers, samplers).
    pub const UNKNOWN: u32 = 0;
    /// Raw or structured buffer view.
    pub const BUFFER: u32 = 1;
    /// 1D texture.
    pub const TEXTURE1D: u32 = 2;
    /// 2D texture.
    pub const TEXTURE2D: u32 = 4;
    /// 3D texture.
    pub const TEXTURE3D: u32 = 8;
    /// Cube texture.
    pub const TEXTURECUBE: u32 = 9;
}

/// A parsed `RDEF` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefChunk {
    /// Raw shader version field (`(program_type << 16) | (major << 8) | minor`).
    pub shader_version: u32,
    /// Compiler identification string, if present.
    pub creator: Option<String>,
    /// Constant buffers, in declaration order.
    pub constant_buffers: Vec<RdefConstantBuffer>,
    /// Bound resources (textures, samplers, buffers), in declaration order.
    pub bound_resources: Vec<RdefResourceBinding>,
}

/// One constant buffer declared by the shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefConstantBuffer {
    /// Buffer name (`$Globals` for the implicit buffer).
    pub name: String,
    /// Declared byte size.
    pub size: u32,
    /// Member variables, in declaration order.
    pub variables: Vec<RdefVariable>,
}

/// One variable inside a constant buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefVariable {
    /// Variable name.
    pub name: String,
    /// Byte offset from the start of the owning buffer.
    pub start_offset: u32,
    /// Byte size inside the buffer.
    pub size: u32,
    /// Usage flags (bit 1 = referenced by the shader).
    pub flags: u32,
    /// Resolved type tree.
    pub ty: RdefType,
    /// Default-value bytes, empty when the source declares none.
    pub default_value: Vec<u8>,
}

/// A resolved `RDEF` type entry, including nested struct members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefType {
    /// Raw class code; see [`RdefTypeClass::from_code`].
    pub class: u16,
    /// Raw base-type code (0 = void, 1 = bool, 2 = int, 3 = float, ...).
    pub base_type: u16,
    /// Row count.
    pub rows: u16,
    /// Column count.
    pub columns: u16,
    /// Array element count (0 for non-arrays).
    pub elements: u16,
    /// Struct members as `(name, byte offset, type)`, empty for non-structs.
    pub members: Vec<(String, u32, RdefType)>,
}

/// One bound resource (texture, sampler, structured/byte buffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdefResourceBinding {
    /// Resource name.
    pub name: String,
    /// Raw input-type code; see [`input_type`].
    pub input_type: u32,
    /// Raw return-type code.
    pub return_type: u32,
    /// Raw dimension code; see [`dimension`].
    pub dimension: u32,
    /// Structured-buffer element stride, reported via the sample-count field.
    pub num_samples: u32,
    /// First bound register.
    pub bind_point: u32,
    /// Number of consecutive registers.
    pub bind_count: u32,
}

/// Parses an `RDEF` chunk payload.
pub fn parse_rdef_chunk(data: &[u8]) -> Result<RdefChunk, DxbcError> {
    let err = |detail: String| DxbcError::invalid_chunk("RDEF", detail);

    if data.len() < HEADER_LEN {
        return Err(err(format!(
            "chunk is {} bytes, need at least {HEADER_LEN}",
            data.len()
        )));
    }

    let cb_count = read_u32(data, 0)? as usize;
    let cb_offset = read_u32(data, 4)? as usize;
    let resource_count = read_u32(data, 8)? as usize;
    let resource_offset = read_u32(data, 12)? as usize;
    let shader_version = read_u32(data, 16)?;
    let _flags = read_u32(data, 20)?;
    let creator_offset = read_u32(data, 24)? as usize;

    let creator = if creator_offset != 0 {
        Some(read_cstr(data, creator_offset).map_err(|e| err(format!("creator string: {e}")))?)
    } else {
        None
    };

    let major = ((shader_version >> 8) & 0xff) as u8;
    let variable_entry_len = if major >= 5 {
        VARIABLE_ENTRY_LEN_SM5
    } else {
        VARIABLE_ENTRY_LEN_SM4
    };

    let mut constant_buffers = Vec::with_capacity(cb_count);
    for i in 0..cb_count {
        let entry = cb_offset
            .checked_add(i * CBUFFER_ENTRY_LEN)
            .filter(|&off| off + CBUFFER_ENTRY_LEN <= data.len())
            .ok_or_else(|| err(format!("constant buffer entry {i} is out of bounds")))?;

        let name_offset = read_u32(data, entry)? as usize;
        let variable_count = read_u32(data, entry + 4)? as usize;
        let variable_offset = read_u32(data, entry + 8)? as usize;
        let size = read_u32(data, entry + 12)?;

        let name =
            read_cstr(data, name_offset).map_err(|e| err(format!("cbuffer {i} name: {e}")))?;

        let mut variables = Vec::with_capacity(variable_count);
        for v in 0..variable_count {
            let var_entry = variable_offset
                .checked_add(v * variable_entry_len)
                .filter(|&off| off + VARIABLE_ENTRY_LEN_SM4 <= data.len())
                .ok_or_else(|| {
                    err(format!("variable entry {v} of cbuffer {name} is out of bounds"))
                })?;
            variables.push(parse_variable(data, var_entry, &name)?);
        }

        constant_buffers.push(RdefConstantBuffer {
            name,
            size,
            variables,
        });
    }

    let mut bound_resources = Vec::with_capacity(resource_count);
    for i in 0..resource_count {
        let entry = resource_offset
            .checked_add(i * RESOURCE_ENTRY_LEN)
            .filter(|&off| off + RESOURCE_ENTRY_LEN <= data.len())
            .ok_or_else(|| err(format!("resource entry {i} is out of bounds")))?;

        let name_offset = read_u32(data, entry)? as usize;
        let name =
            read_cstr(data, name_offset).map_err(|e| err(format!("resource {i} name: {e}")))?;

        bound_resources.push(RdefResourceBinding {
            name,
            input_type: read_u32(data, entry + 4)?,
            return_type: read_u32(data, entry + 8)?,
            dimension: read_u32(data, entry + 12)?,
            num_samples: read_u32(data, entry + 16)?,
            bind_point: read_u32(data, entry + 20)?,
            bind_count: read_u32(data, entry + 24)?,
        });
    }

    Ok(RdefChunk {
        shader_version,
        creator,
        constant_buffers,
        bound_resources,
    })
}

fn parse_variable(data: &[u8], entry: usize, cbuffer: &str) -> Result<RdefVariable, DxbcError> {
    let err = |detail: String| DxbcError::invalid_chunk("RDEF", detail);

    let name_offset = read_u32(data, entry)? as usize;
    let start_offset = read_u32(data, entry + 4)?;
    let size = read_u32(data, entry + 8)?;
    let flags = read_u32(data, entry + 12)?;
    let type_offset = read_u32(data, entry + 16)? as usize;
    let default_offset = read_u32(data, entry + 20)? as usize;

    let name = read_cstr(data, name_offset)
        .map_err(|e| err(format!("variable name in cbuffer {cbuffer}: {e}")))?;
    let ty = parse_type(data, type_offset, 0)
        .map_err(|e| err(format!("type of variable {name}: {e}")))?;

    let default_value = if default_offset != 0 {
        let end = default_offset
            .checked_add(size as usize)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| err(format!("default value of variable {name} is out of bounds")))?;
        data[default_offset..end].to_vec()
    } else {
        Vec::new()
    };

    Ok(RdefVariable {
        name,
        start_offset,
        size,
        flags,
        ty,
        default_value,
    })
}

fn parse_type(data: &[u8], offset: usize, depth: u32) -> Result<RdefType, String> {
    if depth > MAX_TYPE_DEPTH {
        return Err(format!("type nesting exceeds depth {MAX_TYPE_DEPTH}"));
    }
    let end = offset
        .checked_add(16)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| format!("type entry at {offset} is out of bounds"))?;
    let entry = &data[offset..end];

    let class = u16::from_le_bytes([entry[0], entry[1]]);
    let base_type = u16::from_le_bytes([entry[2], entry[3]]);
    let rows = u16::from_le_bytes([entry[4], entry[5]]);
    let columns = u16::from_le_bytes([entry[6], entry[7]]);
    let elements = u16::from_le_bytes([entry[8], entry[9]]);
    let member_count = u16::from_le_bytes([entry[10], entry[11]]) as usize;
    let member_offset = u32::from_le_bytes([entry[12], entry[13], entry[14], entry[15]]) as usize;

    let mut members = Vec::with_capacity(member_count);
    for m in 0..member_count {
        let member_entry = member_offset
            .checked_add(m * MEMBER_ENTRY_LEN)
            .filter(|&off| off + MEMBER_ENTRY_LEN <= data.len())
            .ok_or_else(|| format!("struct member entry {m} is out of bounds"))?;

        let name_offset = read_u32_raw(data, member_entry)? as usize;
        let member_type_offset = read_u32_raw(data, member_entry + 4)? as usize;
        let offset_in_struct = read_u32_raw(data, member_entry + 8)?;

        let name = read_cstr(data, name_offset)?;
        let member_ty = parse_type(data, member_type_offset, depth + 1)?;
        members.push((name, offset_in_struct, member_ty));
    }

    Ok(RdefType {
        class,
        base_type,
        rows,
        columns,
        elements,
        members,
    })
}

fn read_u32_raw(data: &[u8], offset: usize) -> Result<u32, String> {
    let end = offset
        .checked_add(4)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| format!("u32 at {offset} is out of bounds"))?;
    let s = &data[offset..end];
    Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

pub(crate) fn read_cstr(data: &[u8], offset: usize) -> Result<String, String> {
    let tail = data
        .get(offset..)
        .ok_or_else(|| format!("string offset {offset} is out of bounds"))?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| format!("string at {offset} is not NUL-terminated"))?;
    std::str::from_utf8(&tail[..len])
        .map(str::to_owned)
        .map_err(|_| format!("string at {offset} is not valid UTF-8"))
}
