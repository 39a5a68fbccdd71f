//! Legacy OpenGL backend: shader-model 1-3 bytecode run through the
//! bytecode-to-GLSL translator, with constants read from the bytecode's own
//! `CTAB` table (translation leaves it untouched).

use tracing::{debug, warn};

use prism_dxbc::{
    parse_ctab_chunk, strip_debug_chunks, ConstantTable, DxbcContainer, FourCC, RegisterSet,
};
use prism_effect::{
    Attribute, ParameterType, SamplerBinding, SamplerKind, Shader, ShaderStage, VertexUsage,
};

use crate::backend::{map_tool_error, texture_parameter_name, CompiledStage, StageRequest};
use crate::error::CompileError;
use crate::glsl;
use crate::normalize;
use crate::toolchain::{BytecodeCompiler, BytecodeTranslator, GlslTarget};

/// The translator's output language is old desktop GLSL.
const TARGET: GlslTarget = GlslTarget {
    es: false,
    version: 110,
};

/// Compiles one stage to translated GLSL.
pub fn compile_stage(
    compiler: &dyn BytecodeCompiler,
    translator: &dyn BytecodeTranslator,
    request: &StageRequest<'_>,
) -> Result<CompiledStage, CompileError> {
    let output = compiler
        .compile(
            request.source,
            request.entry_point,
            request.model,
            request.macros,
            request.debug,
        )
        .map_err(|e| map_tool_error(request, e))?;

    // Old shader models often cannot be stripped; the full blob is fine, the
    // translator ignores debug payloads.
    let bytecode = if request.debug {
        output.bytecode
    } else {
        match strip_debug_chunks(&output.bytecode) {
            Some(stripped) => stripped,
            None => output.bytecode,
        }
    };

    let table = constant_table(&bytecode, request)?;
    let translated = translator
        .translate(&bytecode, request.stage)
        .map_err(|e| map_tool_error(request, e))?;
    let text = glsl::patch_source(&translated.text, request.stage, TARGET)?;

    let buffer = normalize::from_constant_table(&table)?;
    let buffers = if buffer.parameters().is_empty() {
        Vec::new()
    } else {
        vec![buffer]
    };

    let mut shader = Shader::new(request.stage, text.into_bytes());
    shader.cbuffer_indices = (0..buffers.len()).collect();

    for constant in &table.constants {
        if RegisterSet::from_code(constant.register_set) != Some(RegisterSet::Sampler) {
            continue;
        }
        let slot = constant.register_index.min(255) as u8;
        shader.samplers.push(SamplerBinding {
            name: constant.name.clone(),
            texture_name: texture_parameter_name(&constant.name),
            kind: sampler_kind(constant.base_type),
            sampler_slot: slot,
            texture_slot: slot,
            state: None,
            parameter: None,
        });
    }

    if request.stage == ShaderStage::Vertex {
        for reflected in &translated.attributes {
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
        constants = table.constants.len(),
        samplers = shader.samplers.len(),
        "translated legacy stage"
    );

    let mut warnings = output.warnings;
    if !translated.warnings.is_empty() {
        if !warnings.is_empty() {
            warnings.push('\n');
        }
        warnings.push_str(&translated.warnings);
    }

    Ok(CompiledStage {
        shader,
        buffers,
        warnings,
    })
}

fn constant_table(
    bytecode: &[u8],
    request: &StageRequest<'_>,
) -> Result<ConstantTable, CompileError> {
    let container = DxbcContainer::parse(bytecode)?;
    let chunk = container
        .chunk(FourCC::CTAB)
        .ok_or_else(|| CompileError::ShaderCompile {
            entry_point: request.entry_point.to_owned(),
            model: request.model.to_owned(),
            detail: "compiled container carries no CTAB constant table".to_owned(),
        })?;
    parse_ctab_chunk(chunk.data).map_err(CompileError::Bytecode)
}

fn sampler_kind(base_type: u16) -> SamplerKind {
    match ParameterType::from_code(base_type.min(255) as u8) {
        Some(ParameterType::Sampler1D) => SamplerKind::Sampler1D,
        Some(ParameterType::Sampler3D) => SamplerKind::Sampler3D,
        Some(ParameterType::SamplerCube) => SamplerKind::SamplerCube,
        _ => SamplerKind::Sampler2D,
    }
}
