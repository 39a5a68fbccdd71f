//! Post-processing of cross-compiled GLSL/ESSL text.
//!
//! The cross-compiler emits source for a different device convention than
//! the one OpenGL renders with, and for a wider language surface than old
//! targets accept. Every generated shader is patched before it is stored:
//!
//! - the `#version` header is dropped when targeting ESSL with an
//!   incompatible version string;
//! - the `GL_ARB_separate_shader_objects` pragma is dropped for old desktop
//!   targets that predate it;
//! - `gl_PerVertex` redeclaration blocks are removed;
//! - a `posFixup` uniform and clip-space correction are injected at every
//!   `gl_Position` write site: once at the end of `main` for vertex shaders,
//!   and before every `EmitVertex()` call for geometry shaders.

use thiserror::Error;

use prism_effect::ShaderStage;

use crate::toolchain::GlslTarget;

/// Name of the injected clip-space correction uniform.
pub const POS_FIXUP_UNIFORM: &str = "posFixup";

const POS_FIXUP_DECL: &str = "uniform vec4 posFixup;\n";

// Flip Y per the render-target orientation, nudge XY by the half-pixel
// offset scaled by W, and widen depth from [0, 1] to [-1, 1].
const POS_FIXUP_CODE: &str = "    gl_Position.y = gl_Position.y * posFixup.y;\n    \
     gl_Position.xy += posFixup.zw * gl_Position.ww;\n    \
     gl_Position.z = gl_Position.z * 2.0 - gl_Position.w;\n";

/// Errors raised while patching generated source.
#[derive(Debug, Clone, Error)]
pub enum GlslPatchError {
    /// The generated source has no function body to inject into.
    #[error("generated {stage} source has no main body to patch")]
    NoMainBody {
        /// Stage name.
        stage: &'static str,
    },
}

/// Applies every patch the target and stage require, returning new text.
pub fn patch_source(
    text: &str,
    stage: ShaderStage,
    target: GlslTarget,
) -> Result<String, GlslPatchError> {
    let mut text = text.to_owned();
    strip_incompatible_version(&mut text, target);
    strip_separate_shader_objects(&mut text, target);
    strip_per_vertex_blocks(&mut text);
    match stage {
        ShaderStage::Vertex => inject_pos_fixup_vertex(&mut text)?,
        ShaderStage::Geometry => inject_pos_fixup_geometry(&mut text),
        _ => {}
    }
    Ok(text)
}

/// Drops a leading `#version` line when targeting ESSL with a version the
/// driver would reject (anything other than the target's own).
fn strip_incompatible_version(text: &mut String, target: GlslTarget) {
    if !target.es {
        return;
    }
    let Some(first_line) = text.lines().next() else {
        return;
    };
    let Some(version) = first_line.trim().strip_prefix("#version") else {
        return;
    };
    if version.trim() != target.version.to_string() {
        let line_len = first_line.len() + usize::from(text.len() > first_line.len());
        text.replace_range(..line_len, "");
    }
}

/// Drops `#extension GL_ARB_separate_shader_objects` lines for desktop
/// targets old enough not to know the extension.
fn strip_separate_shader_objects(text: &mut String, target: GlslTarget) {
    if target.es || target.version >= 150 {
        return;
    }
    while let Some(pos) = text.find("#extension GL_ARB_separate_shader_objects") {
        let start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = text[pos..]
            .find('\n')
            .map(|i| pos + i + 1)
            .unwrap_or(text.len());
        text.replace_range(start..end, "");
    }
}

/// Removes `gl_PerVertex { ... };` redeclaration blocks.
fn strip_per_vertex_blocks(text: &mut String) {
    while let Some(pos) = text.find("gl_PerVertex") {
        let start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let Some(close) = text[pos..].find("};") else {
            // A bare mention without a block body; leave the text alone
            // rather than eating the rest of the shader.
            return;
        };
        let end = pos + close + 2;
        let end = text[end..]
            .find('\n')
            .map(|i| end + i + 1)
            .unwrap_or(text.len());
        text.replace_range(start..end, "");
    }
}

fn inject_pos_fixup_vertex(text: &mut String) -> Result<(), GlslPatchError> {
    if text.contains(POS_FIXUP_DECL.trim_end()) {
        return Ok(());
    }
    // The generated vertex entry point is the last function in the file, so
    // the final closing brace ends its body.
    let Some(close) = text.rfind('}') else {
        return Err(GlslPatchError::NoMainBody { stage: "vertex" });
    };
    text.insert_str(close, POS_FIXUP_CODE);
    insert_after_preamble(text, POS_FIXUP_DECL);
    Ok(())
}

fn inject_pos_fixup_geometry(text: &mut String) {
    if text.contains(POS_FIXUP_DECL.trim_end()) {
        return;
    }
    // Geometry shaders emit a vertex per EmitVertex() call; the fixup must
    // run before each one. A shader with no call sites needs no fixup.
    let patched = text.replace("EmitVertex", &format!("{POS_FIXUP_CODE}    EmitVertex"));
    if patched != *text {
        *text = patched;
        insert_after_preamble(text, POS_FIXUP_DECL);
    }
}

/// Inserts `decl` after the leading run of `#` directives and blank lines.
fn insert_after_preamble(text: &mut String, decl: &str) {
    let mut at = 0;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            at += line.len() + 1;
            at = at.min(text.len());
        } else {
            break;
        }
    }
    text.insert_str(at, decl);
}
