//! Strategy seams for the external compiler toolchains.
//!
//! Each backend adapter drives one of these traits; production
//! implementations wrap a native compiler (in-process library or spawned
//! tool), and tests substitute in-memory fakes. The traits carry exactly the
//! data the adapters need: compiled output plus the native reflection shape,
//! which the normalizer then folds into the parameter model.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use prism_effect::{SamplerKind, SamplerState, ShaderStage};

use crate::process::run_tool;

/// Preprocessor macro pairs handed to every toolchain.
pub type MacroSet = Vec<(String, String)>;

/// Errors from external toolchain invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool process could not be launched.
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        /// Tool name.
        tool: String,
        /// Launch failure.
        #[source]
        source: io::Error,
    },
    /// The tool ran but reported failure.
    #[error("{tool} exited with status {status}: {stderr}")]
    Failed {
        /// Tool name.
        tool: String,
        /// Exit code (-1 when terminated by a signal).
        status: i32,
        /// Captured standard error.
        stderr: String,
    },
    /// The tool ran but its output could not be consumed.
    #[error("{tool} produced unreadable output: {detail}")]
    MalformedOutput {
        /// Tool name.
        tool: String,
        /// What went wrong.
        detail: String,
    },
    /// Temp-file plumbing around a tool invocation failed.
    #[error("temporary file for {tool}: {source}")]
    TempFile {
        /// Tool name.
        tool: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Output of a bytecode compiler invocation.
#[derive(Debug, Clone)]
pub struct BytecodeOutput {
    /// The compiled container/token stream.
    pub bytecode: Vec<u8>,
    /// Warning text to surface to the caller.
    pub warnings: String,
}

/// An HLSL-to-bytecode compiler (the Direct3D path's native compiler).
pub trait BytecodeCompiler {
    /// Compiles one entry point to bytecode.
    fn compile(
        &self,
        source: &str,
        entry_point: &str,
        model: &str,
        macros: &MacroSet,
        debug: bool,
    ) -> Result<BytecodeOutput, ToolError>;
}

/// Target shading language for the source cross-compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlslTarget {
    /// Emit ESSL rather than desktop GLSL.
    pub es: bool,
    /// Language version (e.g. 110, 300).
    pub version: u16,
}

/// One uniform reported by cross-compiler block reflection.
///
/// `name` may carry embedded array syntax (`"Bones[72]"`); `type_name` is the
/// compiler's spelling of the element type. Rows/columns follow the
/// cross-compiler's column-major convention.
#[derive(Debug, Clone)]
pub struct UniformReflection {
    /// Uniform name, possibly with array suffix.
    pub name: String,
    /// Type string (`"float"`, `"int"`, `"bool"`).
    pub type_name: String,
    /// Row count.
    pub rows: u8,
    /// Column count.
    pub columns: u8,
    /// Byte offset inside the block.
    pub offset: u32,
}

/// One uniform block reported by the cross-compiler.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    /// Block name.
    pub name: String,
    /// Instance name when the block is declared through one.
    pub instance_name: Option<String>,
    /// Binding slot.
    pub binding: u32,
    /// Uniforms in reflection order.
    pub uniforms: Vec<UniformReflection>,
}

/// A sampler/texture pairing reported by a translator or cross-compiler.
#[derive(Debug, Clone)]
pub struct SamplerBridge {
    /// Sampler variable name.
    pub name: String,
    /// Texture parameter the sampler reads.
    pub texture_name: String,
    /// Dimensionality.
    pub kind: SamplerKind,
    /// Texture/sampler unit assigned by the tool.
    pub slot: u8,
    /// Source-declared sampler state, when any.
    pub state: Option<SamplerState>,
}

/// A vertex input reported by a translator or cross-compiler.
#[derive(Debug, Clone)]
pub struct AttributeReflection {
    /// Attribute variable name in the generated source.
    pub name: String,
    /// Semantic name without its index.
    pub semantic: String,
    /// Semantic index.
    pub semantic_index: u8,
    /// Assigned input location.
    pub location: u16,
}

/// Output of a source cross-compiler invocation.
#[derive(Debug, Clone)]
pub struct CrossCompiledShader {
    /// Generated GLSL/ESSL text.
    pub text: String,
    /// Uniform blocks with byte-offset reflection.
    pub uniform_blocks: Vec<UniformBlock>,
    /// Sampler/texture pairings.
    pub samplers: Vec<SamplerBridge>,
    /// Vertex inputs (vertex stage only).
    pub attributes: Vec<AttributeReflection>,
    /// Warning text to surface to the caller.
    pub warnings: String,
}

/// An HLSL-to-GLSL source cross-compiler.
pub trait SourceCrossCompiler {
    /// Cross-compiles one entry point to the target language.
    fn cross_compile(
        &self,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
        target: GlslTarget,
        macros: &MacroSet,
    ) -> Result<CrossCompiledShader, ToolError>;
}

/// Output of the legacy bytecode-to-GLSL translator.
///
/// Constants are *not* reported here: the legacy path reads them from the
/// bytecode's own constant table, which survives translation unchanged.
#[derive(Debug, Clone)]
pub struct TranslatedShader {
    /// Generated GLSL text.
    pub text: String,
    /// Vertex inputs (vertex stage only).
    pub attributes: Vec<AttributeReflection>,
    /// Warning text to surface to the caller.
    pub warnings: String,
}

/// The legacy Direct3D-bytecode-to-GLSL translator.
pub trait BytecodeTranslator {
    /// Translates shader-model 1-3 bytecode into GLSL.
    fn translate(&self, bytecode: &[u8], stage: ShaderStage) -> Result<TranslatedShader, ToolError>;
}

/// Per-invocation flags for the standalone SPIR-V compiler.
#[derive(Debug, Clone, Copy)]
pub struct SpirvRequest {
    /// Added to every `b#` binding.
    pub buffer_shift: u32,
    /// Added to every `t#` binding.
    pub texture_shift: u32,
    /// Added to every `s#` binding.
    pub sampler_shift: u32,
    /// Apply the clip-space Y flip for Vulkan presentation.
    pub invert_y: bool,
    /// Keep debug info in the binary.
    pub debug: bool,
}

/// Output of a SPIR-V compiler invocation.
#[derive(Debug, Clone)]
pub struct SpirvOutput {
    /// The SPIR-V binary.
    pub binary: Vec<u8>,
    /// Human-readable disassembly, consumed as the reflection substitute.
    pub disassembly: String,
    /// Warning text to surface to the caller.
    pub warnings: String,
}

/// A SPIR-V-emitting HLSL compiler.
pub trait SpirvCompiler {
    /// Compiles one entry point to SPIR-V plus disassembly text.
    fn compile(
        &self,
        source: &str,
        entry_point: &str,
        model: &str,
        stage: ShaderStage,
        macros: &MacroSet,
        request: &SpirvRequest,
    ) -> Result<SpirvOutput, ToolError>;
}

/// The set of toolchains available to one compile.
///
/// Only the toolchain the selected profile needs must be present; a missing
/// one surfaces as a structured error, not a panic.
#[derive(Default)]
pub struct Toolchains {
    /// HLSL-to-bytecode compiler (DirectX11 and the legacy GL front half).
    pub bytecode: Option<Box<dyn BytecodeCompiler>>,
    /// Source cross-compiler (OpenGL/OpenGLES).
    pub cross: Option<Box<dyn SourceCrossCompiler>>,
    /// Legacy bytecode translator (legacy OpenGL back half).
    pub translator: Option<Box<dyn BytecodeTranslator>>,
    /// SPIR-V compiler (DirectX12/Vulkan).
    pub spirv: Option<Box<dyn SpirvCompiler>>,
}

/// The standalone SPIR-V compiler, driven as an external process.
///
/// The source is handed over via a temp file; binding shifts and the
/// clip-space flag travel as command-line flags; the binary and its
/// disassembly listing come back through output files.
#[derive(Debug, Clone)]
pub struct DxcTool {
    /// Path of the compiler executable.
    pub executable: PathBuf,
}

impl DxcTool {
    /// A tool resolved from `PATH` under its conventional name.
    pub fn from_path() -> Self {
        DxcTool {
            executable: PathBuf::from("dxc"),
        }
    }

    fn tool_name(&self) -> String {
        self.executable.display().to_string()
    }
}

impl SpirvCompiler for DxcTool {
    fn compile(
        &self,
        source: &str,
        entry_point: &str,
        model: &str,
        stage: ShaderStage,
        macros: &MacroSet,
        request: &SpirvRequest,
    ) -> Result<SpirvOutput, ToolError> {
        let tool = self.tool_name();
        let temp_err = |source: io::Error| ToolError::TempFile {
            tool: tool.clone(),
            source,
        };

        let dir = tempfile::tempdir().map_err(temp_err)?;
        let source_path = dir.path().join("shader.hlsl");
        let binary_path = dir.path().join("shader.spv");
        let listing_path = dir.path().join("shader.spvasm");
        fs::write(&source_path, source).map_err(temp_err)?;

        let mut command = Command::new(&self.executable);
        command
            .arg("-spirv")
            .args(["-T", model])
            .args(["-E", entry_point])
            .args(["-fvk-b-shift", &request.buffer_shift.to_string(), "0"])
            .args(["-fvk-t-shift", &request.texture_shift.to_string(), "0"])
            .args(["-fvk-s-shift", &request.sampler_shift.to_string(), "0"]);
        if request.invert_y {
            command.arg("-fvk-invert-y");
        }
        if request.debug {
            command.arg("-Zi");
        }
        for (name, value) in macros {
            command.arg("-D").arg(format!("{name}={value}"));
        }
        command
            .arg("-Fo")
            .arg(&binary_path)
            .arg("-Fc")
            .arg(&listing_path)
            .arg(&source_path);

        debug!(tool = %tool, entry_point, model, stage = stage.name(), "invoking SPIR-V compiler");
        let output = run_tool(&tool, &mut command)?;
        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                status: output.status.code().unwrap_or(-1),
                stderr: output.stderr,
            });
        }

        let binary = fs::read(&binary_path).map_err(|e| ToolError::MalformedOutput {
            tool: tool.clone(),
            detail: format!("missing SPIR-V output file: {e}"),
        })?;
        let disassembly =
            fs::read_to_string(&listing_path).map_err(|e| ToolError::MalformedOutput {
                tool: tool.clone(),
                detail: format!("missing disassembly listing: {e}"),
            })?;

        Ok(SpirvOutput {
            binary,
            disassembly,
            warnings: output.stderr,
        })
    }
}
