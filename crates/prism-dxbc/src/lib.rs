//! A safe, bounds-checked parser for DirectX shader bytecode containers (`DXBC`).
//!
//! The effect pipeline hands this crate blobs produced by external HLSL
//! compilers and needs the container's *metadata*, never its instructions:
//!
//! - `RDEF` resource definition chunks (constant buffers, nested variable
//!   types, default-value blobs, bound textures/samplers/buffers).
//! - `CTAB` legacy constant tables (register-set symbol tables emitted for
//!   shader models 1 through 3).
//! - The shader version token (stage + model), for both legacy and
//!   SM4+ bytecode.
//!
//! Parsing never panics on malformed input: every offset and size is
//! validated against the chunk or container bounds before it is read.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod container;
/// Parser for legacy Direct3D constant table chunks (`CTAB`).
pub mod ctab;
mod error;
mod fourcc;
/// Shader version-token decoding (stage + shader model).
pub mod model;
/// Parser for DXBC resource definition chunks (`RDEF`).
pub mod rdef;
/// Parser for DXBC input-signature chunks (`ISGN`).
pub mod signature;
/// Debug-chunk stripping (container rebuild without debug payloads).
pub mod strip;

/// Helpers for building synthetic DXBC blobs in tests.
///
/// Only available to this crate's own tests or behind the `test-utils`
/// feature; not part of the stable parsing API.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests_reflection;

pub use crate::container::{DxbcChunk, DxbcContainer, DxbcHeader};
pub use crate::ctab::{parse_ctab_chunk, ConstantTable, CtabConstant, RegisterSet};
pub use crate::error::DxbcError;
pub use crate::fourcc::FourCC;
pub use crate::model::{shader_model_from_dxbc, ShaderModel, ShaderStageKind};
pub use crate::rdef::{
    parse_rdef_chunk, RdefChunk, RdefConstantBuffer, RdefResourceBinding, RdefType, RdefTypeClass,
    RdefVariable,
};
pub use crate::signature::{parse_signature_chunk, InputSignature, SignatureEntry};
pub use crate::strip::strip_debug_chunks;
