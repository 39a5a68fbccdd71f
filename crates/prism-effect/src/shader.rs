/// The pipeline stage a compiled shader targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Pixel (fragment) shader.
    Pixel,
    /// Hull (tessellation control) shader.
    Hull,
    /// Domain (tessellation evaluation) shader.
    Domain,
    /// Geometry shader.
    Geometry,
    /// Compute shader.
    Compute,
}

impl ShaderStage {
    /// The legacy state-table operation code for binding this stage in a pass.
    ///
    /// Codes 146/147 are the historical vertex/pixel assignments; the later
    /// stages extend the table past its original end.
    pub fn state_operation(self) -> u16 {
        match self {
            ShaderStage::Vertex => 146,
            ShaderStage::Pixel => 147,
            ShaderStage::Geometry => 148,
            ShaderStage::Hull => 149,
            ShaderStage::Domain => 150,
            ShaderStage::Compute => 151,
        }
    }

    /// Inverse of [`state_operation`](Self::state_operation).
    pub fn from_state_operation(op: u16) -> Option<Self> {
        Some(match op {
            146 => ShaderStage::Vertex,
            147 => ShaderStage::Pixel,
            148 => ShaderStage::Geometry,
            149 => ShaderStage::Hull,
            150 => ShaderStage::Domain,
            151 => ShaderStage::Compute,
            _ => return None,
        })
    }

    /// Stable wire code.
    pub fn code(self) -> u8 {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => 1,
            ShaderStage::Hull => 2,
            ShaderStage::Domain => 3,
            ShaderStage::Geometry => 4,
            ShaderStage::Compute => 5,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => ShaderStage::Vertex,
            1 => ShaderStage::Pixel,
            2 => ShaderStage::Hull,
            3 => ShaderStage::Domain,
            4 => ShaderStage::Geometry,
            5 => ShaderStage::Compute,
            _ => return None,
        })
    }

    /// Lowercase stage name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Pixel => "pixel",
            ShaderStage::Hull => "hull",
            ShaderStage::Domain => "domain",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Compute => "compute",
        }
    }
}

/// Vertex-attribute usage, mirroring the classic vertex-declaration set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum VertexUsage {
    Position,
    Color,
    TextureCoordinate,
    Normal,
    Binormal,
    Tangent,
    BlendIndices,
    BlendWeight,
    Depth,
    Fog,
    PointSize,
    Sample,
    TessellateFactor,
}

impl VertexUsage {
    /// Stable wire code.
    pub fn code(self) -> u8 {
        match self {
            VertexUsage::Position => 0,
            VertexUsage::Color => 1,
            VertexUsage::TextureCoordinate => 2,
            VertexUsage::Normal => 3,
            VertexUsage::Binormal => 4,
            VertexUsage::Tangent => 5,
            VertexUsage::BlendIndices => 6,
            VertexUsage::BlendWeight => 7,
            VertexUsage::Depth => 8,
            VertexUsage::Fog => 9,
            VertexUsage::PointSize => 10,
            VertexUsage::Sample => 11,
            VertexUsage::TessellateFactor => 12,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => VertexUsage::Position,
            1 => VertexUsage::Color,
            2 => VertexUsage::TextureCoordinate,
            3 => VertexUsage::Normal,
            4 => VertexUsage::Binormal,
            5 => VertexUsage::Tangent,
            6 => VertexUsage::BlendIndices,
            7 => VertexUsage::BlendWeight,
            8 => VertexUsage::Depth,
            9 => VertexUsage::Fog,
            10 => VertexUsage::PointSize,
            11 => VertexUsage::Sample,
            12 => VertexUsage::TessellateFactor,
            _ => return None,
        })
    }

    /// Maps an input-semantic name (without its index) to a usage.
    pub fn from_semantic(semantic: &str) -> Option<Self> {
        Some(match semantic.to_ascii_uppercase().as_str() {
            "POSITION" | "SV_POSITION" => VertexUsage::Position,
            "COLOR" => VertexUsage::Color,
            "TEXCOORD" => VertexUsage::TextureCoordinate,
            "NORMAL" => VertexUsage::Normal,
            "BINORMAL" => VertexUsage::Binormal,
            "TANGENT" => VertexUsage::Tangent,
            "BLENDINDICES" => VertexUsage::BlendIndices,
            "BLENDWEIGHT" => VertexUsage::BlendWeight,
            "PSIZE" => VertexUsage::PointSize,
            _ => return None,
        })
    }
}

/// One vertex input attribute (vertex shaders only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute variable name.
    pub name: String,
    /// Semantic usage.
    pub usage: VertexUsage,
    /// Semantic index (`TEXCOORD1` has index 1).
    pub index: u8,
    /// Input location/register assigned by the backend.
    pub location: u16,
}

/// Sampler dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SamplerKind {
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
}

impl SamplerKind {
    /// Stable wire code.
    pub fn code(self) -> u8 {
        match self {
            SamplerKind::Sampler1D => 0,
            SamplerKind::Sampler2D => 1,
            SamplerKind::Sampler3D => 2,
            SamplerKind::SamplerCube => 3,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => SamplerKind::Sampler1D,
            1 => SamplerKind::Sampler2D,
            2 => SamplerKind::Sampler3D,
            3 => SamplerKind::SamplerCube,
            _ => return None,
        })
    }
}

/// Fixed-function sampler state captured from the source, when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerState {
    /// Filter mode code.
    pub filter: u8,
    /// U address mode code.
    pub address_u: u8,
    /// V address mode code.
    pub address_v: u8,
    /// W address mode code.
    pub address_w: u8,
}

impl Default for SamplerState {
    fn default() -> Self {
        // Linear filtering, wrap addressing.
        SamplerState {
            filter: 0,
            address_u: 0,
            address_v: 0,
            address_w: 0,
        }
    }
}

/// A sampler/texture pairing reflected from one shader.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerBinding {
    /// Sampler variable name.
    pub name: String,
    /// Name of the texture parameter this sampler reads.
    pub texture_name: String,
    /// Dimensionality.
    pub kind: SamplerKind,
    /// Bound sampler slot.
    pub sampler_slot: u8,
    /// Bound texture slot.
    pub texture_slot: u8,
    /// Source-declared sampler state, when any was given.
    pub state: Option<SamplerState>,
    /// Index of the texture parameter in the effect-wide table; populated by
    /// parameter linking.
    pub parameter: Option<usize>,
}

/// Kinds of non-texture shader resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ShaderResourceKind {
    StructuredBuffer,
    RwStructuredBuffer,
    ByteAddressBuffer,
    RwByteAddressBuffer,
}

impl ShaderResourceKind {
    /// Stable wire code.
    pub fn code(self) -> u8 {
        match self {
            ShaderResourceKind::StructuredBuffer => 0,
            ShaderResourceKind::RwStructuredBuffer => 1,
            ShaderResourceKind::ByteAddressBuffer => 2,
            ShaderResourceKind::RwByteAddressBuffer => 3,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => ShaderResourceKind::StructuredBuffer,
            1 => ShaderResourceKind::RwStructuredBuffer,
            2 => ShaderResourceKind::ByteAddressBuffer,
            3 => ShaderResourceKind::RwByteAddressBuffer,
            _ => return None,
        })
    }
}

/// A structured or byte-address buffer binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderResource {
    /// Resource variable name.
    pub name: String,
    /// Resource kind.
    pub kind: ShaderResourceKind,
    /// Element stride in bytes (0 for byte-address buffers).
    pub element_size: u16,
    /// Bound slot.
    pub slot: u8,
    /// Index of the resource parameter in the effect-wide table; populated by
    /// parameter linking.
    pub parameter: Option<usize>,
}

/// One compiled shader stage.
///
/// Created once per distinct `(entry point, model)` request; two requests
/// whose compiled bytes match byte-for-byte collapse to a single instance
/// identified by `shared_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    /// Stage kind.
    pub stage: ShaderStage,
    /// Compiled bytecode, or cross-compiled source text as bytes.
    pub code: Vec<u8>,
    /// Index of this shader in the effect's shared shader list.
    pub shared_index: usize,
    /// Vertex input attributes; empty for non-vertex stages.
    pub attributes: Vec<Attribute>,
    /// Sampler/texture pairings.
    pub samplers: Vec<SamplerBinding>,
    /// Indexes of the constant buffers this shader references, into the
    /// effect's shared buffer list.
    pub cbuffer_indices: Vec<usize>,
    /// Structured/byte-address resources.
    pub resources: Vec<ShaderResource>,
}

impl Shader {
    /// A shader with no reflection data attached yet.
    pub fn new(stage: ShaderStage, code: Vec<u8>) -> Self {
        Shader {
            stage,
            code,
            shared_index: 0,
            attributes: Vec::new(),
            samplers: Vec::new(),
            cbuffer_indices: Vec::new(),
            resources: Vec::new(),
        }
    }
}
