//! The effect cross-compilation pipeline.
//!
//! One shader-effect source names techniques containing passes, each pass
//! binding entry points for up to six stages plus fixed-function state. This
//! crate turns that into a backend-specific artifact: it validates shader
//! models against the selected profile, drives one external compiler adapter
//! per stage, reconciles each backend's reflection into the shared parameter
//! model from `prism-effect`, deduplicates shaders and constant buffers
//! across the whole effect, and links the effect-wide parameter table the
//! serialized layout records.
//!
//! The textual technique/pass parser and the command-line front end are
//! collaborators, not residents: this crate consumes their [`TechniqueInfo`]
//! and [`CompileOptions`] output and never sees the source grammar.

#![forbid(unsafe_code)]

/// The effect assembler: techniques, passes, and stages to a linked effect.
pub mod assemble;
/// Per-profile compiler adapters.
pub mod backend;
/// Line-oriented SPIR-V disassembly parsing (reflection substitute).
pub mod disasm;
mod error;
/// Post-processing of cross-compiled GLSL/ESSL text.
pub mod glsl;
/// Reflection-to-parameter-model normalization.
pub mod normalize;
/// Compile options handed in by the front end.
pub mod options;
/// Technique/pass descriptions handed in by the source parser.
pub mod pass_info;
/// External-process invocation.
pub mod process;
/// Profile selection and shader-model gates.
pub mod profile;
/// Toolchain strategy seams and the process-backed SPIR-V compiler.
pub mod toolchain;

#[cfg(test)]
mod tests_pipeline;

pub use crate::assemble::{compile_effect, CompiledEffect};
pub use crate::error::CompileError;
pub use crate::normalize::NormalizeError;
pub use crate::options::{parse_defines, CompileOptions};
pub use crate::pass_info::{PassInfo, StageRef, TechniqueInfo};
pub use crate::profile::Profile;
pub use crate::toolchain::{
    BytecodeCompiler, BytecodeTranslator, DxcTool, SourceCrossCompiler, SpirvCompiler, ToolError,
    Toolchains,
};
