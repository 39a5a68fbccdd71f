use thiserror::Error;

use crate::disasm::DisasmError;
use crate::glsl::GlslPatchError;
use crate::normalize::NormalizeError;
use crate::toolchain::ToolError;

/// Errors that abort an effect compile.
///
/// Nothing here is recoverable: the first fatal error halts the whole effect
/// and no partial output file is produced.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The source declares no techniques.
    #[error("the effect source declares no techniques")]
    NoTechniques,
    /// A pass names a stage whose model string fails the profile gate.
    #[error(
        "shader model {model:?} of entry point {entry_point:?} is not supported by the {profile} profile"
    )]
    ShaderModel {
        /// Offending model string.
        model: String,
        /// Entry-point function name.
        entry_point: String,
        /// Profile name.
        profile: &'static str,
    },
    /// A pass names a stage kind the profile cannot compile at all.
    #[error("the {profile} profile has no {stage} stage support (entry point {entry_point:?})")]
    StageNotSupported {
        /// Stage name.
        stage: &'static str,
        /// Entry-point function name.
        entry_point: String,
        /// Profile name.
        profile: &'static str,
    },
    /// The profile needs an external toolchain that was not provided.
    #[error("the {profile} profile requires a {tool} toolchain")]
    MissingToolchain {
        /// Profile name.
        profile: &'static str,
        /// Which toolchain is missing.
        tool: &'static str,
    },
    /// A shader stage failed to compile; carries the tool's error text.
    #[error("shader {entry_point:?} ({model}) failed to compile: {detail}")]
    ShaderCompile {
        /// Entry-point function name.
        entry_point: String,
        /// Shader model string.
        model: String,
        /// Tool/stderr text.
        detail: String,
    },
    /// External tool invocation failed.
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// Reflection could not be normalized into the parameter model.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    /// SPIR-V disassembly text could not be parsed.
    #[error(transparent)]
    Disasm(#[from] DisasmError),
    /// Cross-compiled source could not be patched.
    #[error(transparent)]
    Patch(#[from] GlslPatchError),
    /// Compiled bytecode is not a readable container.
    #[error("compiled bytecode is malformed: {0}")]
    Bytecode(#[from] prism_dxbc::DxbcError),
    /// The effect object model rejected an operation.
    #[error(transparent)]
    Effect(#[from] prism_effect::EffectError),
    /// The assembled effect could not be serialized.
    #[error(transparent)]
    Write(#[from] prism_effect::WriteError),
}
