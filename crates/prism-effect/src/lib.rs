//! The compiled-effect object model.
//!
//! An effect is the unit the pipeline produces for one source file: techniques
//! containing passes, each pass binding per-stage shaders and fixed-function
//! state; the shaders' reflected parameters normalized into constant buffers;
//! and an effect-wide parameter table the runtime indexes into.
//!
//! Everything here is backend-agnostic: compiler adapters produce these types
//! from their native reflection shapes, the assembler deduplicates and links
//! them, and [`write`] serializes the result into the versioned binary layout
//! the runtime loader consumes ([`read`] is that loader's parsing half, also
//! used by round-trip tests).

#![forbid(unsafe_code)]

mod error;
/// Constant buffers: ordered parameter lists at fixed byte offsets.
pub mod buffer;
/// The effect build context: arenas, dedup, parameter linking.
pub mod effect;
/// Parameters: typed values reflected out of shaders.
pub mod parameter;
/// Binary reader for the serialized effect layout.
pub mod read;
/// Compiled per-stage shaders and their bindings.
pub mod shader;
/// Techniques, passes, and fixed-function state snapshots.
pub mod technique;
/// Binary writer for the serialized effect layout.
pub mod write;


pub use crate::buffer::ConstantBuffer;
pub use crate::effect::Effect;
pub use crate::error::{EffectError, ReadError, WriteError};
pub use crate::parameter::{parse_array_suffix, Parameter, ParameterClass, ParameterType};
pub use crate::shader::{
    Attribute, SamplerBinding, SamplerKind, SamplerState, Shader, ShaderResource,
    ShaderResourceKind, ShaderStage, VertexUsage,
};
pub use crate::technique::{
    BlendSnapshot, ColorWriteChannels, DepthStencilSnapshot, Pass, RasterizerSnapshot,
    StateBinding, Technique,
};
