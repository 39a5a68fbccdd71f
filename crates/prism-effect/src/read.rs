//! Binary reader for the serialized effect layout.
//!
//! This is the runtime loader's parsing half, kept next to the writer so the
//! two halves of the wire contract cannot drift apart; round-trip tests pin
//! them together. Field order and widths are documented in [`crate::write`].

use crate::buffer::ConstantBuffer;
use crate::effect::Effect;
use crate::error::ReadError;
use crate::parameter::{Parameter, ParameterClass, ParameterType};
use crate::shader::{
    Attribute, SamplerBinding, SamplerKind, SamplerState, Shader, ShaderResource,
    ShaderResourceKind, ShaderStage, VertexUsage,
};
use crate::technique::{
    BlendSnapshot, ColorWriteChannels, DepthStencilSnapshot, Pass, RasterizerSnapshot,
    StateBinding, Technique,
};
use crate::write::{FORMAT_VERSION, MAGIC};

/// Parses a serialized effect, returning it with its profile tag.
pub fn read_effect(bytes: &[u8]) -> Result<(Effect, u8), ReadError> {
    let mut cursor = Cursor { bytes, pos: 0 };

    let magic = cursor.take(4)?;
    if magic != MAGIC {
        return Err(ReadError::BadMagic);
    }
    let version = cursor.u8()?;
    if version != FORMAT_VERSION {
        return Err(ReadError::UnsupportedVersion(version));
    }
    let profile_tag = cursor.u8()?;

    let mut effect = Effect::new();

    let cbuffer_count = cursor.u8()?;
    for _ in 0..cbuffer_count {
        effect.constant_buffers.push(read_constant_buffer(&mut cursor)?);
    }

    let shader_count = cursor.u8()?;
    for _ in 0..shader_count {
        let shader = read_shader(&mut cursor, effect.shaders.len())?;
        effect.shaders.push(shader);
    }

    let parameter_count = cursor.u8()?;
    for _ in 0..parameter_count {
        let parameter = read_parameter(&mut cursor)?;
        effect.parameters.push(parameter);
    }

    let technique_count = cursor.u8()?;
    for _ in 0..technique_count {
        let name = cursor.str()?;
        let pass_count = cursor.u8()?;
        let mut passes = Vec::with_capacity(pass_count as usize);
        for _ in 0..pass_count {
            passes.push(read_pass(&mut cursor)?);
        }
        effect.techniques.push(Technique { name, passes });
    }

    Ok((effect, profile_tag))
}

/// Parses one serialized constant buffer.
pub fn read_constant_buffer(cursor: &mut Cursor<'_>) -> Result<ConstantBuffer, ReadError> {
    let name = cursor.str()?;
    let size = cursor.u16()? as u32;
    let count = cursor.u8()?;
    let mut pairs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = cursor.u8()? as usize;
        let offset = cursor.u16()? as u32;
        pairs.push((index, offset));
    }
    Ok(ConstantBuffer::from_wire(name, size, pairs))
}

fn read_shader(cursor: &mut Cursor<'_>, shared_index: usize) -> Result<Shader, ReadError> {
    let stage_code = cursor.u8()?;
    let stage = ShaderStage::from_code(stage_code).ok_or(ReadError::InvalidCode {
        what: "shader stage",
        code: stage_code as u32,
        offset: cursor.pos - 1,
    })?;

    let code_len = cursor.u32()? as usize;
    let code = cursor.take(code_len)?.to_vec();
    let mut shader = Shader::new(stage, code);
    shader.shared_index = shared_index;

    let attribute_count = cursor.u8()?;
    for _ in 0..attribute_count {
        let name = cursor.str()?;
        let usage_code = cursor.u8()?;
        let usage = VertexUsage::from_code(usage_code).ok_or(ReadError::InvalidCode {
            what: "vertex usage",
            code: usage_code as u32,
            offset: cursor.pos - 1,
        })?;
        let index = cursor.u8()?;
        let location = cursor.u16()?;
        shader.attributes.push(Attribute {
            name,
            usage,
            index,
            location,
        });
    }

    let sampler_count = cursor.u8()?;
    for _ in 0..sampler_count {
        let kind_code = cursor.u8()?;
        let kind = SamplerKind::from_code(kind_code).ok_or(ReadError::InvalidCode {
            what: "sampler kind",
            code: kind_code as u32,
            offset: cursor.pos - 1,
        })?;
        let name = cursor.str()?;
        let texture_name = cursor.str()?;
        let sampler_slot = cursor.u8()?;
        let texture_slot = cursor.u8()?;
        let state = if cursor.u8()? != 0 {
            Some(SamplerState {
                filter: cursor.u8()?,
                address_u: cursor.u8()?,
                address_v: cursor.u8()?,
                address_w: cursor.u8()?,
            })
        } else {
            None
        };
        let parameter = cursor.u8()? as usize;
        shader.samplers.push(SamplerBinding {
            name,
            texture_name,
            kind,
            sampler_slot,
            texture_slot,
            state,
            parameter: Some(parameter),
        });
    }

    let cbuffer_count = cursor.u8()?;
    for _ in 0..cbuffer_count {
        shader.cbuffer_indices.push(cursor.u8()? as usize);
    }

    let resource_count = cursor.u8()?;
    for _ in 0..resource_count {
        let name = cursor.str()?;
        let kind_code = cursor.u8()?;
        let kind = ShaderResourceKind::from_code(kind_code).ok_or(ReadError::InvalidCode {
            what: "shader resource kind",
            code: kind_code as u32,
            offset: cursor.pos - 1,
        })?;
        let element_size = cursor.u16()?;
        let slot = cursor.u8()?;
        let parameter = cursor.u8()? as usize;
        shader.resources.push(ShaderResource {
            name,
            kind,
            element_size,
            slot,
            parameter: Some(parameter),
        });
    }

    Ok(shader)
}

fn read_parameter(cursor: &mut Cursor<'_>) -> Result<Parameter, ReadError> {
    let name = cursor.str()?;
    let semantic = cursor.str()?;

    let class_code = cursor.u8()?;
    let class = ParameterClass::from_code(class_code).ok_or(ReadError::InvalidCode {
        what: "parameter class",
        code: class_code as u32,
        offset: cursor.pos - 1,
    })?;
    let type_code = cursor.u8()?;
    let ty = ParameterType::from_code(type_code).ok_or(ReadError::InvalidCode {
        what: "parameter type",
        code: type_code as u32,
        offset: cursor.pos - 1,
    })?;

    let mut parameter = Parameter::new(name, class, ty);
    parameter.semantic = semantic;
    parameter.rows = cursor.u8()?;
    parameter.columns = cursor.u8()?;

    let data_len = cursor.u16()? as usize;
    parameter.data = cursor.take(data_len)?.to_vec();

    let element_count = cursor.u8()?;
    let member_count = cursor.u8()?;
    for _ in 0..element_count {
        parameter.elements.push(read_parameter(cursor)?);
    }
    for _ in 0..member_count {
        parameter.members.push(read_parameter(cursor)?);
    }
    Ok(parameter)
}

fn read_pass(cursor: &mut Cursor<'_>) -> Result<Pass, ReadError> {
    let mut pass = Pass::new(cursor.str()?);

    pass.blend = BlendSnapshot {
        enabled: cursor.u8()? != 0,
        color_source: cursor.u8()?,
        color_dest: cursor.u8()?,
        color_op: cursor.u8()?,
        alpha_source: cursor.u8()?,
        alpha_dest: cursor.u8()?,
        alpha_op: cursor.u8()?,
        write_mask: ColorWriteChannels::from_bits_truncate(cursor.u8()?),
    };

    pass.depth_stencil = DepthStencilSnapshot {
        depth_enabled: cursor.u8()? != 0,
        depth_write: cursor.u8()? != 0,
        depth_function: cursor.u8()?,
        stencil_enabled: cursor.u8()? != 0,
        stencil_function: cursor.u8()?,
        stencil_pass_op: cursor.u8()?,
        stencil_fail_op: cursor.u8()?,
        stencil_ref: cursor.u8()?,
    };

    pass.rasterizer = RasterizerSnapshot {
        cull_mode: cursor.u8()?,
        fill_mode: cursor.u8()?,
        scissor_test: cursor.u8()? != 0,
        depth_bias: cursor.f32()?,
        slope_scale_depth_bias: cursor.f32()?,
    };

    let state_count = cursor.u8()?;
    for _ in 0..state_count {
        let operation = cursor.u16()?;
        let shader = cursor.u8()? as usize;
        pass.states.push(StateBinding { operation, shader });
    }

    Ok(pass)
}

/// A bounds-checked read cursor over a serialized effect.
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Wraps `bytes` starting at offset zero.
    pub fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ReadError::UnexpectedEof(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ReadError> {
        let s = self.take(2)?;
        Ok(u16::from_le_bytes([s[0], s[1]]))
    }

    fn u32(&mut self) -> Result<u32, ReadError> {
        let s = self.take(4)?;
        Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    fn f32(&mut self) -> Result<f32, ReadError> {
        Ok(f32::from_bits(self.u32()?))
    }

    fn str(&mut self) -> Result<String, ReadError> {
        let start = self.pos;
        let len = self.u8()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ReadError::InvalidString(start))
    }
}
