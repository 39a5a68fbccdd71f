use regex::Regex;

use prism_effect::ShaderStage;

use crate::error::CompileError;
use crate::pass_info::PassInfo;

/// The target backend/shading-language combination.
///
/// A closed set: each variant selects a compiler adapter, a shader-model
/// gate, and a macro set. `OpenGlLegacy` is the bytecode-translator path
/// (shader models 1-3); `OpenGl`/`OpenGles` cross-compile source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Direct3D 11 bytecode (shader models 4-5).
    DirectX11,
    /// Direct3D 12 via SPIR-V-capable compiler (shader model 6).
    DirectX12,
    /// Vulkan SPIR-V (shader model 6).
    Vulkan,
    /// Desktop OpenGL via source cross-compilation.
    OpenGl,
    /// Desktop OpenGL via the legacy bytecode translator (shader models 1-3).
    OpenGlLegacy,
    /// OpenGL ES via source cross-compilation.
    OpenGles,
}

impl Profile {
    /// Human-readable profile name, as used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Profile::DirectX11 => "DirectX11",
            Profile::DirectX12 => "DirectX12",
            Profile::Vulkan => "Vulkan",
            Profile::OpenGl => "OpenGL",
            Profile::OpenGlLegacy => "OpenGL (legacy)",
            Profile::OpenGles => "OpenGLES",
        }
    }

    /// Stable wire tag recorded in the serialized effect header.
    pub fn tag(self) -> u8 {
        match self {
            Profile::DirectX11 => 0,
            Profile::DirectX12 => 1,
            Profile::Vulkan => 2,
            Profile::OpenGl => 3,
            Profile::OpenGlLegacy => 4,
            Profile::OpenGles => 5,
        }
    }

    /// Parses a profile name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "directx11" | "dx11" => Profile::DirectX11,
            "directx12" | "dx12" => Profile::DirectX12,
            "vulkan" => Profile::Vulkan,
            "opengl" | "gl" => Profile::OpenGl,
            "opengl-legacy" | "gl-legacy" => Profile::OpenGlLegacy,
            "opengles" | "gles" => Profile::OpenGles,
            _ => return None,
        })
    }

    /// Appends this profile's predefined preprocessor macros.
    pub fn add_macros(self, macros: &mut Vec<(String, String)>) {
        let mut push = |name: &str, value: &str| {
            macros.push((name.to_owned(), value.to_owned()));
        };
        match self {
            Profile::DirectX11 => {
                push("__DIRECTX__", "1");
                push("SM4", "1");
            }
            Profile::DirectX12 => {
                push("__DIRECTX__", "1");
                push("SM6", "1");
            }
            Profile::Vulkan => {
                push("__VULKAN__", "1");
                push("SM6", "1");
            }
            Profile::OpenGl | Profile::OpenGlLegacy => {
                push("__OPENGL__", "1");
            }
            Profile::OpenGles => {
                push("__OPENGL__", "1");
                push("__OPENGL_ES__", "1");
            }
        }
    }

    /// The shader-model pattern for `stage`, or `None` when this profile has
    /// no support for the stage at all.
    pub fn shader_model_pattern(self, stage: ShaderStage) -> Option<&'static str> {
        use ShaderStage::*;
        match self {
            // Feature levels 9_1/9_3 compile as 4_0_level_9_* targets; anything
            // older than model 4 cannot produce hardware-supportable output.
            Profile::DirectX11 => Some(match stage {
                Vertex => r"^vs_(4_0(_level_9_[13])?|4_1|5_0)$",
                Pixel => r"^ps_(4_0(_level_9_[13])?|4_1|5_0)$",
                Geometry => r"^gs_(4_0|4_1|5_0)$",
                Hull => r"^hs_5_0$",
                Domain => r"^ds_5_0$",
                Compute => r"^cs_5_0$",
            }),
            // The SPIR-V compiler accepts exactly model 6.0.
            Profile::DirectX12 | Profile::Vulkan => Some(match stage {
                Vertex => r"^vs_6_0$",
                Pixel => r"^ps_6_0$",
                Geometry => r"^gs_6_0$",
                Hull => r"^hs_6_0$",
                Domain => r"^ds_6_0$",
                Compute => r"^cs_6_0$",
            }),
            // The bytecode translator tops out at shader model 3.
            Profile::OpenGlLegacy => match stage {
                Vertex => Some(r"^vs_[1-3]_[0-9]$"),
                Pixel => Some(r"^ps_[1-3]_[0-9]$"),
                _ => None,
            },
            Profile::OpenGl | Profile::OpenGles => match stage {
                Vertex => Some(r"^vs_[2-5]_[0-9]$"),
                Pixel => Some(r"^ps_[2-5]_[0-9]$"),
                _ => None,
            },
        }
    }

    /// Compiles the shader-model gate for `stage`.
    pub fn shader_model_regex(self, stage: ShaderStage) -> Option<Regex> {
        self.shader_model_pattern(stage)
            .map(|pattern| Regex::new(pattern).expect("hard-coded shader model pattern"))
    }

    /// Checks every stage a pass declares against this profile's gates.
    ///
    /// This is a compile-time gate, not a runtime fallback: a model below the
    /// profile minimum aborts the effect before any backend is invoked.
    pub fn validate_shader_models(self, pass: &PassInfo) -> Result<(), CompileError> {
        for (stage, stage_ref) in pass.stages() {
            let Some(regex) = self.shader_model_regex(stage) else {
                return Err(CompileError::StageNotSupported {
                    stage: stage.name(),
                    entry_point: stage_ref.entry_point.clone(),
                    profile: self.name(),
                });
            };
            if !regex.is_match(&stage_ref.model) {
                return Err(CompileError::ShaderModel {
                    model: stage_ref.model.clone(),
                    entry_point: stage_ref.entry_point.clone(),
                    profile: self.name(),
                });
            }
        }
        Ok(())
    }
}
