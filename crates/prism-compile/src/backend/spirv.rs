//! SPIR-V backend (Direct3D 12 / Vulkan): external compiler plus a
//! disassembly listing in place of structured reflection.
//!
//! All descriptors land in one set, so the `b#`/`t#`/`s#` register spaces of
//! every stage must be shifted into disjoint binding ranges before they can
//! coexist in a pipeline; the shifts travel to the compiler as command-line
//! flags and come back in the listing's `Binding` decorations.

use tracing::{debug, warn};

use prism_effect::{
    Attribute, SamplerBinding, SamplerKind, Shader, ShaderStage, VertexUsage,
};

use crate::backend::{map_tool_error, texture_parameter_name, CompiledStage, StageRequest};
use crate::disasm::{self, SpirvImageDim, SpirvObject, SpirvObjectKind};
use crate::error::CompileError;
use crate::normalize;
use crate::toolchain::{SpirvCompiler, SpirvRequest, UniformBlock, UniformReflection};

/// Base binding of the `b#` range inside a stage block.
pub const SHIFT_CBUFFER: u32 = 0;
/// Base binding of the `t#` range inside a stage block.
pub const SHIFT_TEXTURE: u32 = 32;
/// Base binding of the `s#` range inside a stage block.
pub const SHIFT_SAMPLER: u32 = 64;
/// Bindings reserved per stage; stage blocks are disjoint.
pub const STAGE_BLOCK_STRIDE: u32 = 96;

/// The binding shifts for one stage's register spaces.
pub fn binding_shifts(stage: ShaderStage) -> (u32, u32, u32) {
    let block = stage_block(stage);
    (
        block + SHIFT_CBUFFER,
        block + SHIFT_TEXTURE,
        block + SHIFT_SAMPLER,
    )
}

fn stage_block(stage: ShaderStage) -> u32 {
    let index = match stage {
        ShaderStage::Vertex => 0,
        ShaderStage::Pixel => 1,
        ShaderStage::Hull => 2,
        ShaderStage::Domain => 3,
        ShaderStage::Geometry => 4,
        ShaderStage::Compute => 5,
    };
    index * STAGE_BLOCK_STRIDE
}

/// Compiles one stage to SPIR-V.
///
/// `invert_y` selects the compiler's clip-space Y flip; Vulkan presentation
/// needs it, Direct3D 12 consumers do not.
pub fn compile_stage(
    compiler: &dyn SpirvCompiler,
    request: &StageRequest<'_>,
    invert_y: bool,
) -> Result<CompiledStage, CompileError> {
    let (buffer_shift, texture_shift, sampler_shift) = binding_shifts(request.stage);
    let spirv_request = SpirvRequest {
        buffer_shift,
        texture_shift,
        sampler_shift,
        invert_y,
        debug: request.debug,
    };

    let output = compiler
        .compile(
            request.source,
            request.entry_point,
            request.model,
            request.stage,
            request.macros,
            &spirv_request,
        )
        .map_err(|e| map_tool_error(request, e))?;

    let symbols = disasm::parse(&output.disassembly)?;

    // Uniform blocks run through the common normalizer; the listing reports
    // the column-major shape, which the spirv flag swaps back.
    let blocks: Vec<UniformBlock> = symbols.blocks.iter().map(block_reflection).collect();
    let buffers = normalize::from_uniform_blocks(&blocks, true)?;

    let mut shader = Shader::new(request.stage, output.binary);
    shader.cbuffer_indices = (0..buffers.len()).collect();

    let textures: Vec<&SpirvObject> = symbols
        .objects
        .iter()
        .filter(|o| matches!(o.kind, SpirvObjectKind::Texture(_)))
        .collect();
    let samplers = symbols
        .objects
        .iter()
        .filter(|o| o.kind == SpirvObjectKind::Sampler);
    for (ordinal, sampler) in samplers.enumerate() {
        let base = texture_parameter_name(&sampler.name);
        let matched = textures
            .iter()
            .find(|t| t.name == base || t.name == format!("{base}Texture"))
            .or_else(|| textures.get(ordinal))
            .copied();

        let (texture_name, texture_slot, kind) = match matched {
            Some(texture) => {
                let dim = match texture.kind {
                    SpirvObjectKind::Texture(dim) => dim,
                    SpirvObjectKind::Sampler => SpirvImageDim::Dim2D,
                };
                (
                    texture.name.clone(),
                    texture.binding.min(255) as u8,
                    sampler_kind(dim),
                )
            }
            None => (base, sampler.binding.min(255) as u8, SamplerKind::Sampler2D),
        };

        shader.samplers.push(SamplerBinding {
            name: sampler.name.clone(),
            texture_name,
            kind,
            sampler_slot: sampler.binding.min(255) as u8,
            texture_slot,
            state: None,
            parameter: None,
        });
    }

    if request.stage == ShaderStage::Vertex {
        for input in &symbols.inputs {
            let (semantic, index) = split_semantic(&input.name);
            let Some(usage) = VertexUsage::from_semantic(semantic) else {
                warn!(semantic = %input.name, "skipping input with unmapped semantic");
                continue;
            };
            shader.attributes.push(Attribute {
                name: input.name.clone(),
                usage,
                index,
                location: input.location.min(u16::MAX.into()) as u16,
            });
        }
    }

    debug!(
        entry_point = request.entry_point,
        model = request.model,
        buffer_shift,
        texture_shift,
        sampler_shift,
        buffers = buffers.len(),
        "compiled SPIR-V stage"
    );

    Ok(CompiledStage {
        shader,
        buffers,
        warnings: output.warnings,
    })
}

fn block_reflection(block: &disasm::SpirvBlock) -> UniformBlock {
    UniformBlock {
        name: block.name.clone(),
        instance_name: (block.instance_name != block.name)
            .then(|| block.instance_name.clone()),
        binding: block.binding,
        uniforms: block
            .members
            .iter()
            .map(|member| UniformReflection {
                name: if member.elements > 0 {
                    format!("{}[{}]", member.name, member.elements)
                } else {
                    member.name.clone()
                },
                type_name: member.scalar.type_name().to_owned(),
                rows: member.rows,
                columns: member.columns,
                offset: member.offset,
            })
            .collect(),
    }
}

fn sampler_kind(dim: SpirvImageDim) -> SamplerKind {
    match dim {
        SpirvImageDim::Dim1D => SamplerKind::Sampler1D,
        SpirvImageDim::Dim2D => SamplerKind::Sampler2D,
        SpirvImageDim::Dim3D => SamplerKind::Sampler3D,
        SpirvImageDim::Cube => SamplerKind::SamplerCube,
    }
}

/// Splits a trailing decimal index off a semantic name: `TEXCOORD1` becomes
/// `("TEXCOORD", 1)`.
fn split_semantic(name: &str) -> (&str, u8) {
    let digits = name
        .bytes()
        .rev()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 || digits == name.len() {
        return (name, 0);
    }
    let (base, index) = name.split_at(name.len() - digits);
    (base, index.parse().unwrap_or(0))
}
