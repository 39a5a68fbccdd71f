//! Direct3D 11 backend: native bytecode compiler plus `RDEF` reflection.

use tracing::{debug, warn};

use prism_dxbc::rdef::{dimension, input_type};
use prism_dxbc::{
    parse_rdef_chunk, parse_signature_chunk, strip_debug_chunks, DxbcContainer, FourCC,
    RdefResourceBinding,
};
use prism_effect::{
    Attribute, SamplerBinding, SamplerKind, Shader, ShaderResource, ShaderResourceKind,
    ShaderStage, VertexUsage,
};

use crate::backend::{map_tool_error, texture_parameter_name, CompiledStage, StageRequest};
use crate::error::CompileError;
use crate::normalize::{self, NormalizeError};
use crate::toolchain::BytecodeCompiler;

/// Compiles one stage to Direct3D 11 bytecode.
pub fn compile_stage(
    compiler: &dyn BytecodeCompiler,
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

    // Strip compiler debug payloads from release builds; a blob the stripper
    // does not understand ships whole.
    let bytecode = if request.debug {
        output.bytecode
    } else {
        match strip_debug_chunks(&output.bytecode) {
            Some(stripped) => stripped,
            None => output.bytecode,
        }
    };

    let container = DxbcContainer::parse(&bytecode)?;
    let rdef = container
        .chunk(FourCC::RDEF)
        .ok_or_else(|| CompileError::ShaderCompile {
            entry_point: request.entry_point.to_owned(),
            model: request.model.to_owned(),
            detail: "compiled container carries no RDEF reflection chunk".to_owned(),
        })
        .and_then(|chunk| parse_rdef_chunk(chunk.data).map_err(CompileError::Bytecode))?;

    let buffers = normalize::from_rdef(&rdef)?;
    let attributes = if request.stage == ShaderStage::Vertex {
        vertex_attributes(&container)?
    } else {
        Vec::new()
    };

    let mut samplers = Vec::new();
    let mut resources = Vec::new();
    let textures: Vec<&RdefResourceBinding> = rdef
        .bound_resources
        .iter()
        .filter(|r| r.input_type == input_type::TEXTURE)
        .collect();

    let mut sampler_ordinal = 0usize;
    for resource in &rdef.bound_resources {
        match resource.input_type {
            input_type::CBUFFER | input_type::TEXTURE => {}
            input_type::SAMPLER => {
                samplers.push(pair_sampler(resource, &textures, sampler_ordinal));
                sampler_ordinal += 1;
            }
            input_type::STRUCTURED => {
                resources.push(shader_resource(resource, ShaderResourceKind::StructuredBuffer));
            }
            input_type::UAV_RWSTRUCTURED => {
                resources.push(shader_resource(resource, ShaderResourceKind::RwStructuredBuffer));
            }
            input_type::BYTEADDRESS => {
                resources.push(shader_resource(resource, ShaderResourceKind::ByteAddressBuffer));
            }
            input_type::UAV_RWBYTEADDRESS => {
                resources.push(shader_resource(resource, ShaderResourceKind::RwByteAddressBuffer));
            }
            other => {
                return Err(NormalizeError::UnsupportedResourceKind {
                    name: resource.name.clone(),
                    kind: other,
                }
                .into())
            }
        }
    }

    debug!(
        entry_point = request.entry_point,
        model = request.model,
        buffers = buffers.len(),
        samplers = samplers.len(),
        resources = resources.len(),
        "compiled DirectX11 stage"
    );

    let mut shader = Shader::new(request.stage, bytecode);
    shader.cbuffer_indices = (0..buffers.len()).collect();
    shader.attributes = attributes;
    shader.samplers = samplers;
    shader.resources = resources;

    Ok(CompiledStage {
        shader,
        buffers,
        warnings: output.warnings,
    })
}

/// Pairs a sampler with the texture it reads: the texture whose name matches
/// the sampler's conventional base name, falling back to the texture declared
/// at the same ordinal.
fn pair_sampler(
    sampler: &RdefResourceBinding,
    textures: &[&RdefResourceBinding],
    ordinal: usize,
) -> SamplerBinding {
    let base = texture_parameter_name(&sampler.name);
    let matched = textures
        .iter()
        .find(|t| t.name == base || t.name == format!("{base}Texture"))
        .or_else(|| textures.get(ordinal))
        .copied();

    let (texture_name, texture_slot, kind) = match matched {
        Some(texture) => (
            texture.name.clone(),
            texture.bind_point.min(255) as u8,
            sampler_kind(texture.dimension, &texture.name),
        ),
        None => (base, sampler.bind_point.min(255) as u8, SamplerKind::Sampler2D),
    };

    SamplerBinding {
        name: sampler.name.clone(),
        texture_name,
        kind,
        sampler_slot: sampler.bind_point.min(255) as u8,
        texture_slot,
        state: None,
        parameter: None,
    }
}

fn sampler_kind(dimension_code: u32, name: &str) -> SamplerKind {
    match dimension_code {
        dimension::TEXTURE1D => SamplerKind::Sampler1D,
        dimension::TEXTURE2D => SamplerKind::Sampler2D,
        dimension::TEXTURE3D => SamplerKind::Sampler3D,
        dimension::TEXTURECUBE => SamplerKind::SamplerCube,
        other => {
            warn!(texture = name, code = other, "unhandled texture dimension, assuming 2D");
            SamplerKind::Sampler2D
        }
    }
}

fn shader_resource(resource: &RdefResourceBinding, kind: ShaderResourceKind) -> ShaderResource {
    let element_size = match kind {
        ShaderResourceKind::StructuredBuffer | ShaderResourceKind::RwStructuredBuffer => {
            resource.num_samples.min(u16::MAX.into()) as u16
        }
        _ => 0,
    };
    ShaderResource {
        name: resource.name.clone(),
        kind,
        element_size,
        slot: resource.bind_point.min(255) as u8,
        parameter: None,
    }
}

/// Recovers vertex attributes from the input signature: one per plain (non
/// system-value) input, keyed by semantic.
fn vertex_attributes(container: &DxbcContainer<'_>) -> Result<Vec<Attribute>, CompileError> {
    let Some(chunk) = container.chunk(FourCC::ISGN) else {
        return Ok(Vec::new());
    };
    let signature = parse_signature_chunk(chunk.data)?;

    let mut attributes = Vec::with_capacity(signature.entries.len());
    for entry in &signature.entries {
        if entry.system_value_type != 0 {
            continue;
        }
        let Some(usage) = VertexUsage::from_semantic(&entry.semantic_name) else {
            warn!(semantic = %entry.semantic_name, "skipping input with unmapped semantic");
            continue;
        };
        attributes.push(Attribute {
            name: format!("{}{}", entry.semantic_name, entry.semantic_index),
            usage,
            index: entry.semantic_index.min(255) as u8,
            location: entry.register.min(u16::MAX.into()) as u16,
        });
    }
    Ok(attributes)
}
