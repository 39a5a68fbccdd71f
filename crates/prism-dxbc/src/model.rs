//! Shader version-token decoding.
//!
//! Legacy bytecode (SM1-3) starts with a `0xFFFE`/`0xFFFF` version token
//! carrying `major.minor` in the low byte pair. SM4+ bytecode stores a
//! program-type field in the high half instead. Both spellings are decoded
//! here so callers never branch on the container generation themselves.

use crate::container::DxbcContainer;
use crate::error::DxbcError;

/// The pipeline stage a shader blob was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    /// Vertex shader.
    Vertex,
    /// Pixel shader.
    Pixel,
    /// Geometry shader.
    Geometry,
    /// Hull (tessellation control) shader.
    Hull,
    /// Domain (tessellation evaluation) shader.
    Domain,
    /// Compute shader.
    Compute,
}

/// A `major.minor` shader model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShaderModel {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

/// Decodes a raw version token into stage and model.
pub fn decode_version_token(token: u32) -> Option<(ShaderStageKind, ShaderModel)> {
    let hi = (token >> 16) as u16;
    match hi {
        // Legacy token stream: 0xFFFE = vertex, 0xFFFF = pixel,
        // major.minor in the low 16 bits.
        0xFFFE | 0xFFFF => {
            let stage = if hi == 0xFFFE {
                ShaderStageKind::Vertex
            } else {
                ShaderStageKind::Pixel
            };
            Some((
                stage,
                ShaderModel {
                    major: ((token >> 8) & 0xFF) as u8,
                    minor: (token & 0xFF) as u8,
                },
            ))
        }
        // SM4+ program-type field.
        ty => {
            let stage = match ty {
                0 => ShaderStageKind::Pixel,
                1 => ShaderStageKind::Vertex,
                2 => ShaderStageKind::Geometry,
                3 => ShaderStageKind::Hull,
                4 => ShaderStageKind::Domain,
                5 => ShaderStageKind::Compute,
                _ => return None,
            };
            Some((
                stage,
                ShaderModel {
                    major: ((token >> 4) & 0xF) as u8,
                    minor: (token & 0xF) as u8,
                },
            ))
        }
    }
}

/// Extracts stage and model from a DXBC blob's shader bytecode chunk.
///
/// Raw legacy token streams (no container) are accepted as well, since SM1-3
/// compilers commonly hand them out bare.
pub fn shader_model_from_dxbc(bytes: &[u8]) -> Result<(ShaderStageKind, ShaderModel), DxbcError> {
    let token = if bytes.starts_with(b"DXBC") {
        let container = DxbcContainer::parse(bytes)?;
        let chunk = container
            .shader_chunk()
            .ok_or(DxbcError::MissingShaderChunk)?;
        first_token(chunk.data)?
    } else {
        first_token(bytes)?
    };

    decode_version_token(token).ok_or_else(|| {
        DxbcError::invalid_chunk("SHDR", format!("unrecognized version token {token:#010x}"))
    })
}

fn first_token(bytes: &[u8]) -> Result<u32, DxbcError> {
    let first: [u8; 4] = bytes
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            DxbcError::invalid_chunk("SHDR", "bytecode shorter than one token".to_owned())
        })?;
    Ok(u32::from_le_bytes(first))
}
