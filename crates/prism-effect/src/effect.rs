use tracing::debug;

use crate::buffer::ConstantBuffer;
use crate::parameter::{Parameter, ParameterClass, ParameterType};
use crate::shader::{SamplerKind, Shader};
use crate::technique::Technique;

/// The in-flight build context for one effect compile.
///
/// Shaders and constant buffers are arena-style append-only vectors; other
/// structures reference them by index (`shared_index`, buffer index) rather
/// than by pointer. Dedup is a linear scan at insertion time, so indexes stay
/// stable for the lifetime of the build. Each compile starts from an empty
/// effect; nothing persists between runs.
#[derive(Debug, Clone, Default)]
pub struct Effect {
    /// Deduplicated constant buffers.
    pub constant_buffers: Vec<ConstantBuffer>,
    /// Deduplicated compiled shaders.
    pub shaders: Vec<Shader>,
    /// Techniques in source order.
    pub techniques: Vec<Technique>,
    /// The effect-wide parameter table; built by [`link_parameters`].
    ///
    /// [`link_parameters`]: Effect::link_parameters
    pub parameters: Vec<Parameter>,
}

impl Effect {
    /// An empty effect.
    pub fn new() -> Self {
        Effect::default()
    }

    /// Adds `buffer` unless a structurally identical one exists; returns the
    /// index of the surviving instance.
    pub fn add_constant_buffer(&mut self, buffer: ConstantBuffer) -> usize {
        if let Some(index) = self
            .constant_buffers
            .iter()
            .position(|existing| existing.same_as(&buffer))
        {
            return index;
        }
        self.constant_buffers.push(buffer);
        self.constant_buffers.len() - 1
    }

    /// Adds `shader` unless one with byte-identical code exists; returns the
    /// shared index of the surviving instance.
    pub fn add_shader(&mut self, mut shader: Shader) -> usize {
        if let Some(index) = self
            .shaders
            .iter()
            .position(|existing| existing.stage == shader.stage && existing.code == shader.code)
        {
            return index;
        }
        let index = self.shaders.len();
        shader.shared_index = index;
        self.shaders.push(shader);
        index
    }

    /// Builds the effect-wide parameter table.
    ///
    /// Runs after all techniques are assembled, in three fixed passes:
    /// constant-buffer parameters, then sampler texture parameters, then
    /// shader-resource parameters. Folding is by name, first match wins; a
    /// later parameter with the same name is assumed to be the same value.
    // TODO: names are not checked for type/size agreement across shaders.
    pub fn link_parameters(&mut self) {
        for buffer in &mut self.constant_buffers {
            buffer.parameter_index.clear();
            for parameter in buffer.parameters() {
                let index = find_or_add(&mut self.parameters, parameter.clone());
                buffer.parameter_index.push(index);
            }
        }

        for shader in &mut self.shaders {
            for sampler in &mut shader.samplers {
                let texture = Parameter::new(
                    sampler.texture_name.clone(),
                    ParameterClass::Object,
                    texture_type(sampler.kind),
                );
                sampler.parameter = Some(find_or_add(&mut self.parameters, texture));
            }
        }

        for shader in &mut self.shaders {
            for resource in &mut shader.resources {
                let parameter = Parameter::new(
                    resource.name.clone(),
                    ParameterClass::Object,
                    ParameterType::Void,
                );
                resource.parameter = Some(find_or_add(&mut self.parameters, parameter));
            }
        }
    }
}

fn texture_type(kind: SamplerKind) -> ParameterType {
    match kind {
        SamplerKind::Sampler1D => ParameterType::Texture1D,
        SamplerKind::Sampler2D => ParameterType::Texture2D,
        SamplerKind::Sampler3D => ParameterType::Texture3D,
        SamplerKind::SamplerCube => ParameterType::TextureCube,
    }
}

fn find_or_add(table: &mut Vec<Parameter>, parameter: Parameter) -> usize {
    if let Some(index) = table.iter().position(|p| p.name == parameter.name) {
        let existing = &table[index];
        if existing.byte_size() != parameter.byte_size() {
            debug!(
                name = %parameter.name,
                existing = existing.byte_size(),
                incoming = parameter.byte_size(),
                "parameter merged by name with mismatched sizes"
            );
        }
        return index;
    }
    table.push(parameter);
    table.len() - 1
}
