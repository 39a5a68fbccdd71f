//! The effect assembler.
//!
//! Walks techniques, passes, and declared stages strictly in source order,
//! gates each pass through the profile's shader-model validation, compiles
//! each distinct `(entry point, model)` pair exactly once, and folds every
//! stage's reflection into the shared effect arenas. After the last pass,
//! parameter linking builds the effect-wide table.
//!
//! One effect compile is single-threaded and synchronous: stage compiles may
//! block for seconds on an external tool, and nothing here overlaps them.
//! Each call starts from an empty effect; no state survives between runs.

use std::collections::HashMap;

use tracing::{debug, info};

use prism_effect::write::write_effect;
use prism_effect::{Effect, Pass, Technique};

use crate::backend::{cross, dx11, legacy, spirv, CompiledStage, StageRequest};
use crate::error::CompileError;
use crate::options::CompileOptions;
use crate::pass_info::TechniqueInfo;
use crate::profile::Profile;
use crate::toolchain::{MacroSet, Toolchains};

/// The result of one effect compile.
#[derive(Debug)]
pub struct CompiledEffect {
    /// The linked effect.
    pub effect: Effect,
    /// Warning text accumulated from every stage, in compile order.
    pub warnings: String,
}

impl CompiledEffect {
    /// Serializes the effect into the versioned binary layout, tagged with
    /// the profile that produced its shaders.
    pub fn to_bytes(&self, profile: Profile) -> Result<Vec<u8>, CompileError> {
        Ok(write_effect(&self.effect, profile.tag())?)
    }
}

/// Compiles one effect source against the given techniques and options.
///
/// The first fatal failure aborts the whole compile; no partial output is
/// ever produced. Warnings accumulate across every stage compiled before the
/// failure point.
pub fn compile_effect(
    source: &str,
    techniques: &[TechniqueInfo],
    options: &CompileOptions,
    tools: &Toolchains,
) -> Result<CompiledEffect, CompileError> {
    if techniques.is_empty() {
        return Err(CompileError::NoTechniques);
    }

    let profile = options.profile;
    let macros = macro_set(options);

    info!(
        source = %options.source_path.display(),
        profile = profile.name(),
        techniques = techniques.len(),
        "compiling effect"
    );

    let mut effect = Effect::new();
    let mut warnings = String::new();
    // One compile per distinct (entry point, model) pair: passes routinely
    // rebind the same function, and identical output additionally collapses
    // through the shader arena's byte-equality dedup.
    let mut compiled: HashMap<(String, String), usize> = HashMap::new();

    for technique_info in techniques {
        let mut technique = Technique {
            name: technique_info.name.clone(),
            passes: Vec::with_capacity(technique_info.passes.len()),
        };

        for pass_info in &technique_info.passes {
            profile.validate_shader_models(pass_info)?;

            let mut pass = Pass::new(&pass_info.name);
            pass.blend = pass_info.blend;
            pass.depth_stencil = pass_info.depth_stencil;
            pass.rasterizer = pass_info.rasterizer;

            for (stage, stage_ref) in pass_info.stages() {
                let key = (stage_ref.entry_point.clone(), stage_ref.model.clone());
                let shared_index = match compiled.get(&key) {
                    Some(&index) => {
                        debug!(
                            entry_point = %stage_ref.entry_point,
                            model = %stage_ref.model,
                            "reusing compiled shader"
                        );
                        index
                    }
                    None => {
                        let request = StageRequest {
                            source,
                            entry_point: &stage_ref.entry_point,
                            model: &stage_ref.model,
                            stage,
                            macros: &macros,
                            debug: options.debug,
                        };
                        let stage_output = dispatch(profile, tools, &request)?;
                        if !stage_output.warnings.is_empty() {
                            if !warnings.is_empty() {
                                warnings.push('\n');
                            }
                            warnings.push_str(&stage_output.warnings);
                        }
                        let index = fold_stage(&mut effect, stage_output);
                        compiled.insert(key, index);
                        index
                    }
                };
                pass.bind_shader(stage, shared_index)?;
            }

            technique.passes.push(pass);
        }

        effect.techniques.push(technique);
    }

    effect.link_parameters();

    info!(
        shaders = effect.shaders.len(),
        constant_buffers = effect.constant_buffers.len(),
        parameters = effect.parameters.len(),
        "effect compiled"
    );

    Ok(CompiledEffect { effect, warnings })
}

fn dispatch(
    profile: Profile,
    tools: &Toolchains,
    request: &StageRequest<'_>,
) -> Result<CompiledStage, CompileError> {
    let missing = |tool: &'static str| CompileError::MissingToolchain {
        profile: profile.name(),
        tool,
    };

    match profile {
        Profile::DirectX11 => {
            let compiler = tools.bytecode.as_deref().ok_or(missing("bytecode compiler"))?;
            dx11::compile_stage(compiler, request)
        }
        Profile::DirectX12 | Profile::Vulkan => {
            let compiler = tools.spirv.as_deref().ok_or(missing("SPIR-V compiler"))?;
            spirv::compile_stage(compiler, request, profile == Profile::Vulkan)
        }
        Profile::OpenGl | Profile::OpenGles => {
            let compiler = tools.cross.as_deref().ok_or(missing("source cross-compiler"))?;
            let target = if profile == Profile::OpenGles {
                cross::ES_TARGET
            } else {
                cross::DESKTOP_TARGET
            };
            cross::compile_stage(compiler, request, target)
        }
        Profile::OpenGlLegacy => {
            let compiler = tools.bytecode.as_deref().ok_or(missing("bytecode compiler"))?;
            let translator = tools.translator.as_deref().ok_or(missing("bytecode translator"))?;
            legacy::compile_stage(compiler, translator, request)
        }
    }
}

/// Folds one compiled stage into the effect arenas, rewriting the shader's
/// local constant-buffer indexes to arena indexes, and returns the shader's
/// shared index.
fn fold_stage(effect: &mut Effect, stage: CompiledStage) -> usize {
    let CompiledStage {
        mut shader,
        buffers,
        ..
    } = stage;

    let arena_indexes: Vec<usize> = buffers
        .into_iter()
        .map(|buffer| effect.add_constant_buffer(buffer))
        .collect();
    for index in &mut shader.cbuffer_indices {
        *index = arena_indexes[*index];
    }

    effect.add_shader(shader)
}

/// Builds the macro set one compile would use, for callers that preprocess
/// separately.
pub fn macro_set(options: &CompileOptions) -> MacroSet {
    let mut macros = options.parse_defines();
    options.profile.add_macros(&mut macros);
    macros.push(if options.debug {
        ("DEBUG".to_owned(), "1".to_owned())
    } else {
        ("OPT".to_owned(), "1".to_owned())
    });
    macros
}
