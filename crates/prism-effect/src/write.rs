//! Deterministic binary serialization of a linked effect.
//!
//! The layout is a stable wire contract, not a self-describing format:
//! consumers read fields in the exact declared order and width. Strings are
//! u8-length-prefixed UTF-8; multi-byte integers are little-endian; counts,
//! slots, and parameter indexes are 8-bit; sizes and offsets are 16-bit.
//!
//! ```text
//! effect:   "PFX " magic, u8 format version, u8 profile tag,
//!           u8 cbuffer count + cbuffers,
//!           u8 shader count + shaders,
//!           u8 parameter count + parameters,
//!           u8 technique count + techniques
//! cbuffer:  str name, u16 size,
//!           u8 count * { u8 parameter index, u16 offset }
//! shader:   u8 stage, u32 code length + code bytes,
//!           u8 count * attribute { str name, u8 usage, u8 index, u16 location },
//!           u8 count * sampler { u8 kind, str name, str texture name,
//!                                u8 sampler slot, u8 texture slot,
//!                                u8 has-state [+ 4 state bytes], u8 parameter },
//!           u8 count * { u8 cbuffer index },
//!           u8 count * resource { str name, u8 kind, u16 element size,
//!                                 u8 slot, u8 parameter }
//! param:    str name, str semantic, u8 class, u8 type, u8 rows, u8 columns,
//!           u16 data length + bytes, u8 element count, u8 member count,
//!           elements..., members...
//! pass:     str name, 8 blend bytes, 8 depth/stencil bytes,
//!           3 rasterizer bytes + 2 f32,
//!           u8 count * { u16 operation, u8 shader index }
//! ```

use crate::buffer::ConstantBuffer;
use crate::effect::Effect;
use crate::error::WriteError;
use crate::parameter::Parameter;
use crate::shader::Shader;
use crate::technique::Pass;

/// Leading magic bytes of a serialized effect.
pub const MAGIC: [u8; 4] = *b"PFX ";
/// Current wire format version.
pub const FORMAT_VERSION: u8 = 1;

/// Serializes a linked effect.
///
/// `profile_tag` records which backend produced the contained shaders; the
/// runtime refuses to load an effect built for a different backend.
pub fn write_effect(effect: &Effect, profile_tag: u8) -> Result<Vec<u8>, WriteError> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.push(profile_tag);

    push_count(&mut out, "constant buffer", effect.constant_buffers.len())?;
    for buffer in &effect.constant_buffers {
        write_constant_buffer(&mut out, buffer)?;
    }

    push_count(&mut out, "shader", effect.shaders.len())?;
    for shader in &effect.shaders {
        write_shader(&mut out, shader)?;
    }

    push_count(&mut out, "parameter", effect.parameters.len())?;
    for parameter in &effect.parameters {
        write_parameter(&mut out, parameter)?;
    }

    push_count(&mut out, "technique", effect.techniques.len())?;
    for technique in &effect.techniques {
        push_str(&mut out, &technique.name)?;
        push_count(&mut out, "pass", technique.passes.len())?;
        for pass in &technique.passes {
            write_pass(&mut out, pass)?;
        }
    }

    Ok(out)
}

/// Serializes one constant buffer: name, 16-bit size, then
/// `(parameter index, 16-bit offset)` pairs.
pub fn write_constant_buffer(out: &mut Vec<u8>, buffer: &ConstantBuffer) -> Result<(), WriteError> {
    if buffer.parameter_index.len() != buffer.parameters().len() {
        return Err(WriteError::Unlinked(
            "constant buffer parameter indexes are not populated",
        ));
    }

    push_str(out, &buffer.name)?;
    push_u16(out, "constant buffer size", buffer.size)?;
    push_count(out, "constant buffer parameter", buffer.parameter_index.len())?;
    for (index, offset) in buffer
        .parameter_index
        .iter()
        .zip(buffer.parameter_offsets())
    {
        push_index(out, "parameter index", *index)?;
        push_u16(out, "parameter offset", *offset)?;
    }
    Ok(())
}

fn write_shader(out: &mut Vec<u8>, shader: &Shader) -> Result<(), WriteError> {
    out.push(shader.stage.code());
    out.extend_from_slice(&(shader.code.len() as u32).to_le_bytes());
    out.extend_from_slice(&shader.code);

    push_count(out, "attribute", shader.attributes.len())?;
    for attribute in &shader.attributes {
        push_str(out, &attribute.name)?;
        out.push(attribute.usage.code());
        out.push(attribute.index);
        out.extend_from_slice(&attribute.location.to_le_bytes());
    }

    push_count(out, "sampler", shader.samplers.len())?;
    for sampler in &shader.samplers {
        out.push(sampler.kind.code());
        push_str(out, &sampler.name)?;
        push_str(out, &sampler.texture_name)?;
        out.push(sampler.sampler_slot);
        out.push(sampler.texture_slot);
        match sampler.state {
            Some(state) => {
                out.push(1);
                out.push(state.filter);
                out.push(state.address_u);
                out.push(state.address_v);
                out.push(state.address_w);
            }
            None => out.push(0),
        }
        let parameter = sampler
            .parameter
            .ok_or(WriteError::Unlinked("sampler texture parameter"))?;
        push_index(out, "sampler parameter index", parameter)?;
    }

    push_count(out, "shader cbuffer reference", shader.cbuffer_indices.len())?;
    for index in &shader.cbuffer_indices {
        push_index(out, "cbuffer index", *index)?;
    }

    push_count(out, "shader resource", shader.resources.len())?;
    for resource in &shader.resources {
        push_str(out, &resource.name)?;
        out.push(resource.kind.code());
        out.extend_from_slice(&resource.element_size.to_le_bytes());
        out.push(resource.slot);
        let parameter = resource
            .parameter
            .ok_or(WriteError::Unlinked("shader resource parameter"))?;
        push_index(out, "resource parameter index", parameter)?;
    }

    Ok(())
}

fn write_parameter(out: &mut Vec<u8>, parameter: &Parameter) -> Result<(), WriteError> {
    push_str(out, &parameter.name)?;
    push_str(out, &parameter.semantic)?;
    out.push(parameter.class.code());
    out.push(parameter.ty.code());
    out.push(parameter.rows);
    out.push(parameter.columns);

    push_u16(out, "parameter data length", parameter.data.len() as u32)?;
    out.extend_from_slice(&parameter.data);

    push_count(out, "array element", parameter.elements.len())?;
    push_count(out, "struct member", parameter.members.len())?;
    for element in &parameter.elements {
        write_parameter(out, element)?;
    }
    for member in &parameter.members {
        write_parameter(out, member)?;
    }
    Ok(())
}

fn write_pass(out: &mut Vec<u8>, pass: &Pass) -> Result<(), WriteError> {
    push_str(out, &pass.name)?;

    let blend = &pass.blend;
    out.push(blend.enabled as u8);
    out.push(blend.color_source);
    out.push(blend.color_dest);
    out.push(blend.color_op);
    out.push(blend.alpha_source);
    out.push(blend.alpha_dest);
    out.push(blend.alpha_op);
    out.push(blend.write_mask.bits());

    let depth = &pass.depth_stencil;
    out.push(depth.depth_enabled as u8);
    out.push(depth.depth_write as u8);
    out.push(depth.depth_function);
    out.push(depth.stencil_enabled as u8);
    out.push(depth.stencil_function);
    out.push(depth.stencil_pass_op);
    out.push(depth.stencil_fail_op);
    out.push(depth.stencil_ref);

    let raster = &pass.rasterizer;
    out.push(raster.cull_mode);
    out.push(raster.fill_mode);
    out.push(raster.scissor_test as u8);
    out.extend_from_slice(&raster.depth_bias.to_le_bytes());
    out.extend_from_slice(&raster.slope_scale_depth_bias.to_le_bytes());

    push_count(out, "pass state", pass.states.len())?;
    for state in &pass.states {
        out.extend_from_slice(&state.operation.to_le_bytes());
        push_index(out, "state shader index", state.shader)?;
    }
    Ok(())
}

fn push_str(out: &mut Vec<u8>, s: &str) -> Result<(), WriteError> {
    let len: u8 = s
        .len()
        .try_into()
        .map_err(|_| WriteError::StringTooLong(s.to_owned()))?;
    out.push(len);
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn push_count(out: &mut Vec<u8>, what: &'static str, count: usize) -> Result<(), WriteError> {
    let count: u8 = count.try_into().map_err(|_| WriteError::CountOverflow {
        what,
        count,
        max: u8::MAX as usize,
    })?;
    out.push(count);
    Ok(())
}

fn push_index(out: &mut Vec<u8>, what: &'static str, index: usize) -> Result<(), WriteError> {
    let index: u8 = index.try_into().map_err(|_| WriteError::FieldOverflow {
        what,
        value: index as u64,
        max: u8::MAX as u64,
    })?;
    out.push(index);
    Ok(())
}

fn push_u16(out: &mut Vec<u8>, what: &'static str, value: u32) -> Result<(), WriteError> {
    let value: u16 = value.try_into().map_err(|_| WriteError::FieldOverflow {
        what,
        value: value as u64,
        max: u16::MAX as u64,
    })?;
    out.extend_from_slice(&value.to_le_bytes());
    Ok(())
}
