//! Per-profile compiler adapters.
//!
//! Each adapter drives one external toolchain behind its strategy trait and
//! reshapes the tool's native reflection into the common shader and
//! constant-buffer model. Backend oddities (debug-strip fallbacks, register
//! packing order, clip-space patching, descriptor shifts) live inside the
//! adapter that needs them; nothing leaks into the assembler.

/// Source cross-compilation (OpenGL / OpenGL ES).
pub mod cross;
/// Direct3D 11 bytecode.
pub mod dx11;
/// Legacy bytecode translation (old OpenGL).
pub mod legacy;
/// SPIR-V (Direct3D 12 / Vulkan).
pub mod spirv;

use prism_effect::{ConstantBuffer, SamplerBinding, Shader, ShaderStage};

use crate::error::CompileError;
use crate::toolchain::{MacroSet, ToolError};

/// One stage compile request, as the assembler hands it to an adapter.
#[derive(Clone, Copy)]
pub struct StageRequest<'a> {
    /// Full effect source text.
    pub source: &'a str,
    /// Entry-point function name.
    pub entry_point: &'a str,
    /// Shader model string, already validated by the profile gate.
    pub model: &'a str,
    /// Stage being compiled.
    pub stage: ShaderStage,
    /// Preprocessor macros (user defines plus profile markers).
    pub macros: &'a MacroSet,
    /// Keep debug info and skip bytecode stripping.
    pub debug: bool,
}

/// What an adapter returns for one compiled stage.
///
/// `shader.cbuffer_indices` index into `buffers` here; the assembler rewrites
/// them to effect arena indexes when it folds the buffers in.
pub struct CompiledStage {
    /// The compiled shader with its reflection attached.
    pub shader: Shader,
    /// Constant buffers this shader references, in local index order.
    pub buffers: Vec<ConstantBuffer>,
    /// Warning text accumulated from the toolchain.
    pub warnings: String,
}

/// Maps a toolchain failure onto the compile-error taxonomy.
///
/// A tool that ran and rejected the shader (or produced unreadable output)
/// is a shader-compile failure carrying the tool's text; infrastructure
/// failures (spawn, temp files) pass through unchanged.
pub(crate) fn map_tool_error(request: &StageRequest<'_>, error: ToolError) -> CompileError {
    match error {
        ToolError::Failed { .. } | ToolError::MalformedOutput { .. } => {
            CompileError::ShaderCompile {
                entry_point: request.entry_point.to_owned(),
                model: request.model.to_owned(),
                detail: error.to_string(),
            }
        }
        other => CompileError::Tool(other),
    }
}

/// The texture parameter name conventionally paired with a sampler.
///
/// `DiffuseSampler` reads the texture parameter `Diffuse`; a sampler without
/// the suffix names its texture directly.
pub(crate) fn texture_parameter_name(sampler_name: &str) -> String {
    match sampler_name.strip_suffix("Sampler") {
        Some(base) if !base.is_empty() => base.to_owned(),
        _ => sampler_name.to_owned(),
    }
}

/// Two-pass sampler slot reassignment.
///
/// A single sampler variable sampling more than one texture is legal in the
/// cross-compiler but not representable as one physical unit, so duplicated
/// slots must be spread out. Pass 1 keeps every original slot that is not
/// contended; pass 2 allocates previously-unused slots to the remaining
/// pairs. No two bindings share a final slot.
pub(crate) fn reassign_sampler_slots(samplers: &mut [SamplerBinding]) {
    let mut taken = [false; 256];
    let mut pending = Vec::new();

    for (index, sampler) in samplers.iter().enumerate() {
        let slot = usize::from(sampler.texture_slot);
        if taken[slot] {
            pending.push(index);
        } else {
            taken[slot] = true;
        }
    }

    for index in pending {
        let Some(free) = taken.iter().position(|used| !used) else {
            break;
        };
        taken[free] = true;
        samplers[index].texture_slot = free as u8;
        samplers[index].sampler_slot = free as u8;
    }
}
