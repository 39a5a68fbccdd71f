//! Source cross-compilation backend (OpenGL / OpenGL ES).

use tracing::{debug, warn};

use prism_effect::{Attribute, SamplerBinding, Shader, ShaderStage, VertexUsage};

use crate::backend::{map_tool_error, reassign_sampler_slots, CompiledStage, StageRequest};
use crate::error::CompileError;
use crate::glsl;
use crate::normalize;
use crate::toolchain::{GlslTarget, SourceCrossCompiler};

/// The desktop OpenGL shading-language target.
pub const DESKTOP_TARGET: GlslTarget = GlslTarget {
    es: false,
    version: 120,
};

/// The OpenGL ES shading-language target.
pub const ES_TARGET: GlslTarget = GlslTarget {
    es: true,
    version: 100,
};

/// Cross-compiles one stage to GLSL/ESSL text.
pub fn compile_stage(
    compiler: &dyn SourceCrossCompiler,
    request: &StageRequest<'_>,
    target: GlslTarget,
) -> Result<CompiledStage, CompileError> {
    let output = compiler
        .cross_compile(
            request.source,
            request.entry_point,
            request.stage,
            target,
            request.macros,
        )
        .map_err(|e| map_tool_error(request, e))?;

    let text = glsl::patch_source(&output.text, request.stage, target)?;
    let buffers = normalize::from_uniform_blocks(&output.uniform_blocks, false)?;

    let mut shader = Shader::new(request.stage, text.into_bytes());
    shader.cbuffer_indices = (0..buffers.len()).collect();

    // The cross-compiler may legally report one sampler variable against
    // several textures; physical units cannot, so contended slots are spread.
    let mut samplers: Vec<SamplerBinding> = output
        .samplers
        .iter()
        .map(|bridge| SamplerBinding {
            name: bridge.name.clone(),
            texture_name: bridge.texture_name.clone(),
            kind: bridge.kind,
            sampler_slot: bridge.slot,
            texture_slot: bridge.slot,
            state: bridge.state,
            parameter: None,
        })
        .collect();
    reassign_sampler_slots(&mut samplers);
    shader.samplers = samplers;

    if request.stage == ShaderStage::Vertex {
        for reflected in &output.attributes {
            let Some(usage) = VertexUsage::from_semantic(&reflected.semantic) else {
                warn!(semantic = %reflected.semantic, "skipping input with unmapped semantic");
                continue;
            };
            shader.attributes.push(Attribute {
                name: reflected.name.clone(),
                usage,
                index: reflected.semantic_index,
                location: reflected.location,
            });
        }
    }

    debug!(
        entry_point = request.entry_point,
        model = request.model,
        es = target.es,
        version = target.version,
        buffers = buffers.len(),
        samplers = shader.samplers.len(),
        "cross-compiled stage"
    );

    Ok(CompiledStage {
        shader,
        buffers,
        warnings: output.warnings,
    })
}
