use bitflags::bitflags;

use crate::error::EffectError;
use crate::shader::ShaderStage;

bitflags! {
    /// Render-target channels a pass writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColorWriteChannels: u8 {
        /// Red channel.
        const RED = 1;
        /// Green channel.
        const GREEN = 2;
        /// Blue channel.
        const BLUE = 4;
        /// Alpha channel.
        const ALPHA = 8;
    }
}

impl Default for ColorWriteChannels {
    fn default() -> Self {
        ColorWriteChannels::all()
    }
}

/// Blend-stage snapshot for one pass.
///
/// Constructed eagerly with device defaults; a pass that never sets blend
/// state serializes the defaults rather than a missing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendSnapshot {
    /// Blending enabled at all.
    pub enabled: bool,
    /// Source factor code for the color channels.
    pub color_source: u8,
    /// Destination factor code for the color channels.
    pub color_dest: u8,
    /// Blend operation code for the color channels.
    pub color_op: u8,
    /// Source factor code for alpha.
    pub alpha_source: u8,
    /// Destination factor code for alpha.
    pub alpha_dest: u8,
    /// Blend operation code for alpha.
    pub alpha_op: u8,
    /// Channel write mask.
    pub write_mask: ColorWriteChannels,
}

impl Default for BlendSnapshot {
    fn default() -> Self {
        // One/Zero/Add: opaque.
        BlendSnapshot {
            enabled: false,
            color_source: 0,
            color_dest: 1,
            color_op: 0,
            alpha_source: 0,
            alpha_dest: 1,
            alpha_op: 0,
            write_mask: ColorWriteChannels::default(),
        }
    }
}

/// Depth/stencil snapshot for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilSnapshot {
    /// Depth test enabled.
    pub depth_enabled: bool,
    /// Depth writes enabled.
    pub depth_write: bool,
    /// Depth comparison function code.
    pub depth_function: u8,
    /// Stencil test enabled.
    pub stencil_enabled: bool,
    /// Stencil comparison function code.
    pub stencil_function: u8,
    /// Stencil pass operation code.
    pub stencil_pass_op: u8,
    /// Stencil fail operation code.
    pub stencil_fail_op: u8,
    /// Stencil reference value.
    pub stencil_ref: u8,
}

impl Default for DepthStencilSnapshot {
    fn default() -> Self {
        DepthStencilSnapshot {
            depth_enabled: true,
            depth_write: true,
            depth_function: 4, // less-equal
            stencil_enabled: false,
            stencil_function: 7, // always
            stencil_pass_op: 0,  // keep
            stencil_fail_op: 0,
            stencil_ref: 0,
        }
    }
}

/// Rasterizer snapshot for one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerSnapshot {
    /// Cull mode code (0 = none, 1 = clockwise, 2 = counter-clockwise).
    pub cull_mode: u8,
    /// Fill mode code (0 = solid, 1 = wireframe).
    pub fill_mode: u8,
    /// Scissor test enabled.
    pub scissor_test: bool,
    /// Constant depth bias.
    pub depth_bias: f32,
    /// Slope-scaled depth bias.
    pub slope_scale_depth_bias: f32,
}

impl Default for RasterizerSnapshot {
    fn default() -> Self {
        RasterizerSnapshot {
            cull_mode: 2,
            fill_mode: 0,
            scissor_test: false,
            depth_bias: 0.0,
            slope_scale_depth_bias: 0.0,
        }
    }
}

/// One pass state entry: a shader bound via the legacy operation-code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateBinding {
    /// Legacy state-table operation code; see
    /// [`ShaderStage::state_operation`].
    pub operation: u16,
    /// `shared_index` of the bound shader.
    pub shader: usize,
}

/// A named set of per-stage shader bindings plus fixed-function state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pass {
    /// Pass name.
    pub name: String,
    /// Blend state.
    pub blend: BlendSnapshot,
    /// Depth/stencil state.
    pub depth_stencil: DepthStencilSnapshot,
    /// Rasterizer state.
    pub rasterizer: RasterizerSnapshot,
    /// Shader bindings in declaration order.
    pub states: Vec<StateBinding>,
}

impl Pass {
    /// An empty pass with default fixed-function state.
    pub fn new(name: impl Into<String>) -> Self {
        Pass {
            name: name.into(),
            ..Pass::default()
        }
    }

    /// Binds a compiled shader to its stage slot.
    ///
    /// A pass holds at most one binding per stage kind.
    pub fn bind_shader(
        &mut self,
        stage: ShaderStage,
        shared_index: usize,
    ) -> Result<(), EffectError> {
        let operation = stage.state_operation();
        if self.states.iter().any(|s| s.operation == operation) {
            return Err(EffectError::DuplicateStageBinding {
                pass: self.name.clone(),
                stage: stage.name(),
            });
        }
        self.states.push(StateBinding {
            operation,
            shader: shared_index,
        });
        Ok(())
    }

    /// The bound shader for `stage`, if any.
    pub fn shader_for(&self, stage: ShaderStage) -> Option<usize> {
        let operation = stage.state_operation();
        self.states
            .iter()
            .find(|s| s.operation == operation)
            .map(|s| s.shader)
    }
}

/// A named, ordered group of passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Technique {
    /// Technique name.
    pub name: String,
    /// Passes in declaration order.
    pub passes: Vec<Pass>,
}
