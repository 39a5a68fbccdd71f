use prism_effect::{BlendSnapshot, DepthStencilSnapshot, RasterizerSnapshot, ShaderStage};

/// An entry point + shader model named by a pass for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRef {
    /// Entry-point function name.
    pub entry_point: String,
    /// Shader model string (`"vs_4_0"`, `"ps_6_0"`, ...).
    pub model: String,
}

impl StageRef {
    /// Convenience constructor.
    pub fn new(entry_point: impl Into<String>, model: impl Into<String>) -> Self {
        StageRef {
            entry_point: entry_point.into(),
            model: model.into(),
        }
    }
}

/// One pass as produced by the technique parser: raw entry-point references
/// plus fixed-function state.
///
/// State snapshots are constructed eagerly with device defaults, so consumers
/// never branch on missing state blocks.
#[derive(Debug, Clone, Default)]
pub struct PassInfo {
    /// Pass name.
    pub name: String,
    /// Vertex stage, when declared.
    pub vertex: Option<StageRef>,
    /// Pixel stage, when declared.
    pub pixel: Option<StageRef>,
    /// Hull stage, when declared.
    pub hull: Option<StageRef>,
    /// Domain stage, when declared.
    pub domain: Option<StageRef>,
    /// Geometry stage, when declared.
    pub geometry: Option<StageRef>,
    /// Compute stage, when declared.
    pub compute: Option<StageRef>,
    /// Blend state set by the pass.
    pub blend: BlendSnapshot,
    /// Depth/stencil state set by the pass.
    pub depth_stencil: DepthStencilSnapshot,
    /// Rasterizer state set by the pass.
    pub rasterizer: RasterizerSnapshot,
}

impl PassInfo {
    /// An empty pass with default state.
    pub fn new(name: impl Into<String>) -> Self {
        PassInfo {
            name: name.into(),
            ..PassInfo::default()
        }
    }

    /// Declared stages in the fixed processing order.
    pub fn stages(&self) -> impl Iterator<Item = (ShaderStage, &StageRef)> {
        [
            (ShaderStage::Pixel, &self.pixel),
            (ShaderStage::Vertex, &self.vertex),
            (ShaderStage::Hull, &self.hull),
            (ShaderStage::Domain, &self.domain),
            (ShaderStage::Geometry, &self.geometry),
            (ShaderStage::Compute, &self.compute),
        ]
        .into_iter()
        .filter_map(|(stage, slot)| slot.as_ref().map(|s| (stage, s)))
    }
}

/// One technique as produced by the technique parser.
#[derive(Debug, Clone, Default)]
pub struct TechniqueInfo {
    /// Technique name.
    pub name: String,
    /// Passes in source order.
    pub passes: Vec<PassInfo>,
}
