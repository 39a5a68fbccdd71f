//! End-to-end assembler tests over in-memory fake toolchains.
//!
//! Each fake implements one toolchain seam and hands back synthetic but
//! well-formed native output (DXBC containers, disassembly listings, GLSL
//! text), so every reflection path runs exactly as it would against the real
//! tools.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use prism_dxbc::test_utils::build_container;
use prism_dxbc::FourCC;
use prism_effect::read::read_effect;
use prism_effect::{ParameterType, SamplerKind, ShaderStage};

use crate::assemble::compile_effect;
use crate::error::CompileError;
use crate::options::CompileOptions;
use crate::pass_info::{PassInfo, StageRef, TechniqueInfo};
use crate::profile::Profile;
use crate::toolchain::{
    AttributeReflection, BytecodeCompiler, BytecodeOutput, BytecodeTranslator, CrossCompiledShader,
    GlslTarget, MacroSet, SamplerBridge, SourceCrossCompiler, SpirvCompiler, SpirvOutput,
    SpirvRequest, ToolError, Toolchains, TranslatedShader, UniformBlock, UniformReflection,
};

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// An `RDEF` chunk declaring cbuffer `Globals { float4x4 WorldViewProjection; }`
/// bound at `b0`, texture `Diffuse` at `t0`, and sampler `DiffuseSampler`
/// at `s0`.
fn rdef_chunk() -> Vec<u8> {
    const CB_ENTRY: u32 = 28;
    const RES_ENTRIES: u32 = CB_ENTRY + 24; // 3 entries * 32
    const VAR_ENTRY: u32 = RES_ENTRIES + 96;
    const TYPE_ENTRY: u32 = VAR_ENTRY + 24;
    const STRINGS: u32 = TYPE_ENTRY + 16;

    const S_GLOBALS: u32 = STRINGS; // "Globals\0"
    const S_WVP: u32 = S_GLOBALS + 8; // "WorldViewProjection\0"
    const S_DIFFUSE: u32 = S_WVP + 20; // "Diffuse\0"
    const S_SAMPLER: u32 = S_DIFFUSE + 8; // "DiffuseSampler\0"

    let mut chunk = Vec::new();
    push_u32(&mut chunk, 1); // cb count
    push_u32(&mut chunk, CB_ENTRY);
    push_u32(&mut chunk, 3); // resource count
    push_u32(&mut chunk, RES_ENTRIES);
    push_u32(&mut chunk, 0x0400); // shader version (4.0)
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, 0); // creator offset

    // cbuffer "Globals": 1 variable, 64 bytes.
    push_u32(&mut chunk, S_GLOBALS);
    push_u32(&mut chunk, 1);
    push_u32(&mut chunk, VAR_ENTRY);
    push_u32(&mut chunk, 64);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    // resource "Globals": cbuffer at b0.
    push_u32(&mut chunk, S_GLOBALS);
    push_u32(&mut chunk, prism_dxbc::rdef::input_type::CBUFFER);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0); // bind point
    push_u32(&mut chunk, 1);
    push_u32(&mut chunk, 0);

    // resource "Diffuse": texture2D at t0.
    push_u32(&mut chunk, S_DIFFUSE);
    push_u32(&mut chunk, prism_dxbc::rdef::input_type::TEXTURE);
    push_u32(&mut chunk, 5);
    push_u32(&mut chunk, prism_dxbc::rdef::dimension::TEXTURE2D);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0); // bind point
    push_u32(&mut chunk, 1);
    push_u32(&mut chunk, 0);

    // resource "DiffuseSampler": sampler at s0.
    push_u32(&mut chunk, S_SAMPLER);
    push_u32(&mut chunk, prism_dxbc::rdef::input_type::SAMPLER);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0); // bind point
    push_u32(&mut chunk, 1);
    push_u32(&mut chunk, 0);

    // variable "WorldViewProjection": float4x4 at offset 0, no default.
    push_u32(&mut chunk, S_WVP);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 64);
    push_u32(&mut chunk, 2);
    push_u32(&mut chunk, TYPE_ENTRY);
    push_u32(&mut chunk, 0);

    // type: column-major float4x4.
    push_u16(&mut chunk, 3);
    push_u16(&mut chunk, 3);
    push_u16(&mut chunk, 4);
    push_u16(&mut chunk, 4);
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    chunk.extend_from_slice(b"Globals\0");
    chunk.extend_from_slice(b"WorldViewProjection\0");
    chunk.extend_from_slice(b"Diffuse\0");
    chunk.extend_from_slice(b"DiffuseSampler\0");
    chunk
}

/// An `ISGN` chunk declaring `POSITION0` at register 0.
fn isgn_chunk() -> Vec<u8> {
    const ENTRY: u32 = 8;
    const S_POSITION: u32 = ENTRY + 24;

    let mut chunk = Vec::new();
    push_u32(&mut chunk, 1); // param count
    push_u32(&mut chunk, ENTRY);

    push_u32(&mut chunk, S_POSITION);
    push_u32(&mut chunk, 0); // semantic index
    push_u32(&mut chunk, 0); // system value type
    push_u32(&mut chunk, 3); // component type
    push_u32(&mut chunk, 0); // register
    push_u32(&mut chunk, 0x0F); // mask

    chunk.extend_from_slice(b"POSITION\0");
    chunk
}

/// A `CTAB` chunk declaring `WorldViewProj` at `c0..c3` and sampler
/// `DiffuseSampler` at `s1`.
fn ctab_chunk() -> Vec<u8> {
    const CONSTANTS: u32 = 28;
    const TYPE_INFOS: u32 = CONSTANTS + 40; // 2 entries * 20
    const STRINGS: u32 = TYPE_INFOS + 32; // 2 entries * 16

    const S_WVP: u32 = STRINGS; // "WorldViewProj\0"
    const S_SAMPLER: u32 = S_WVP + 14; // "DiffuseSampler\0"

    let mut chunk = Vec::new();
    push_u32(&mut chunk, 28);
    push_u32(&mut chunk, 0); // creator
    push_u32(&mut chunk, 0); // version
    push_u32(&mut chunk, 2); // constant count
    push_u32(&mut chunk, CONSTANTS);
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, 0); // no target string

    push_u32(&mut chunk, S_WVP);
    push_u16(&mut chunk, 2); // float4 set
    push_u16(&mut chunk, 0); // register index
    push_u16(&mut chunk, 4); // register count
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, TYPE_INFOS);
    push_u32(&mut chunk, 0);

    push_u32(&mut chunk, S_SAMPLER);
    push_u16(&mut chunk, 3); // sampler set
    push_u16(&mut chunk, 1); // register index
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, TYPE_INFOS + 16);
    push_u32(&mut chunk, 0);

    // float4x4.
    push_u16(&mut chunk, 3);
    push_u16(&mut chunk, 3);
    push_u16(&mut chunk, 4);
    push_u16(&mut chunk, 4);
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    // sampler2D object.
    push_u16(&mut chunk, 4);
    push_u16(&mut chunk, 12);
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    chunk.extend_from_slice(b"WorldViewProj\0");
    chunk.extend_from_slice(b"DiffuseSampler\0");
    chunk
}

#[derive(Default)]
struct FakeBytecodeCompiler {
    calls: Rc<Cell<usize>>,
    legacy: bool,
    warnings: &'static str,
}

impl BytecodeCompiler for FakeBytecodeCompiler {
    fn compile(
        &self,
        _source: &str,
        entry_point: &str,
        model: &str,
        _macros: &MacroSet,
        _debug: bool,
    ) -> Result<BytecodeOutput, ToolError> {
        self.calls.set(self.calls.get() + 1);
        // Distinct shader chunk bytes per request keep unrelated entry points
        // from collapsing in the shader arena.
        let code = format!("{entry_point}:{model}").into_bytes();
        let bytecode = if self.legacy {
            build_container(&[(FourCC::CTAB, &ctab_chunk()), (FourCC::SHDR, &code)])
        } else {
            build_container(&[
                (FourCC::RDEF, &rdef_chunk()),
                (FourCC::ISGN, &isgn_chunk()),
                (FourCC::SHEX, &code),
            ])
        };
        Ok(BytecodeOutput {
            bytecode,
            warnings: self.warnings.to_owned(),
        })
    }
}

struct FailingCompiler;

impl BytecodeCompiler for FailingCompiler {
    fn compile(
        &self,
        _source: &str,
        _entry_point: &str,
        _model: &str,
        _macros: &MacroSet,
        _debug: bool,
    ) -> Result<BytecodeOutput, ToolError> {
        Err(ToolError::Failed {
            tool: "fxc".to_owned(),
            status: 1,
            stderr: "error X3000: syntax error".to_owned(),
        })
    }
}

fn options(profile: Profile) -> CompileOptions {
    CompileOptions {
        source_path: PathBuf::from("Sprite.fx"),
        output_path: PathBuf::from("Sprite.bin"),
        profile,
        debug: false,
        defines: String::new(),
    }
}

fn technique(name: &str, passes: Vec<PassInfo>) -> TechniqueInfo {
    TechniqueInfo {
        name: name.to_owned(),
        passes,
    }
}

fn pass(name: &str, vs: (&str, &str), ps: (&str, &str)) -> PassInfo {
    let mut pass = PassInfo::new(name);
    pass.vertex = Some(StageRef::new(vs.0, vs.1));
    pass.pixel = Some(StageRef::new(ps.0, ps.1));
    pass
}

#[test]
fn directx11_effect_dedups_shaders_buffers_and_parameters() {
    let tools = Toolchains {
        bytecode: Some(Box::new(FakeBytecodeCompiler {
            warnings: "warning X3206: implicit truncation",
            ..FakeBytecodeCompiler::default()
        })),
        ..Toolchains::default()
    };

    let techniques = vec![technique(
        "Main",
        vec![
            pass("P0", ("VsMain", "vs_4_0"), ("PsMain", "ps_4_0")),
            pass("P1", ("VsMain", "vs_4_0"), ("PsGlow", "ps_4_0")),
        ],
    )];

    let compiled = compile_effect("fx source", &techniques, &options(Profile::DirectX11), &tools)
        .expect("effect should compile");
    let effect = &compiled.effect;

    // Four stage bindings, three distinct (entry, model) pairs.
    assert_eq!(effect.shaders.len(), 3);

    // Every stage reflects the same cbuffer; structural dedup keeps one.
    assert_eq!(effect.constant_buffers.len(), 1);
    for shader in &effect.shaders {
        assert_eq!(shader.cbuffer_indices, vec![0]);
    }

    // One WorldViewProjection entry plus the sampler's texture parameter.
    let names: Vec<&str> = effect.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["WorldViewProjection", "Diffuse"]);
    assert_eq!(effect.constant_buffers[0].parameter_index, vec![0]);
    assert_eq!(effect.parameters[1].ty, ParameterType::Texture2D);

    // Both passes bind the same shared vertex shader.
    let p0 = &effect.techniques[0].passes[0];
    let p1 = &effect.techniques[0].passes[1];
    assert_eq!(
        p0.shader_for(ShaderStage::Vertex),
        p1.shader_for(ShaderStage::Vertex)
    );
    assert_ne!(
        p0.shader_for(ShaderStage::Pixel),
        p1.shader_for(ShaderStage::Pixel)
    );

    // The vertex shader carries the signature-derived attribute.
    let vs_index = p0.shader_for(ShaderStage::Vertex).unwrap();
    let vs = &effect.shaders[vs_index];
    assert_eq!(vs.attributes.len(), 1);
    assert_eq!(vs.attributes[0].name, "POSITION0");

    // One warning per distinct compile, newline-separated.
    assert_eq!(compiled.warnings.lines().count(), 3);

    // The serialized layout round-trips through the runtime reader.
    let bytes = compiled.to_bytes(Profile::DirectX11).expect("should serialize");
    let (reread, tag) = read_effect(&bytes).expect("should reread");
    assert_eq!(tag, Profile::DirectX11.tag());
    assert_eq!(reread.shaders.len(), effect.shaders.len());
    assert_eq!(reread.parameters.len(), effect.parameters.len());
    assert_eq!(reread.techniques.len(), 1);
    assert_eq!(reread.techniques[0].passes.len(), 2);
}

#[test]
fn entry_model_cache_compiles_each_pair_once() {
    let fake = FakeBytecodeCompiler::default();
    let calls = Rc::clone(&fake.calls);
    let tools = Toolchains {
        bytecode: Some(Box::new(fake)),
        ..Toolchains::default()
    };

    let techniques = vec![
        technique(
            "A",
            vec![pass("P0", ("VsMain", "vs_4_0"), ("PsMain", "ps_4_0"))],
        ),
        technique(
            "B",
            vec![pass("P0", ("VsMain", "vs_4_0"), ("PsMain", "ps_4_0"))],
        ),
    ];
    let compiled = compile_effect("fx source", &techniques, &options(Profile::DirectX11), &tools)
        .expect("effect should compile");

    // Two techniques, four bindings, two distinct (entry, model) pairs.
    assert_eq!(calls.get(), 2);
    assert_eq!(compiled.effect.shaders.len(), 2);
}

struct FakeSpirvCompiler {
    requests: Rc<RefCell<Vec<(ShaderStage, SpirvRequest)>>>,
}

const SPIRV_LISTING: &str = r#"
               OpName %type_Globals "type.Globals"
               OpMemberName %type_Globals 0 "WorldViewProjection"
               OpMemberName %type_Globals 1 "Bend"
               OpName %Globals "Globals"
               OpName %DiffuseTexture "DiffuseTexture"
               OpName %DiffuseSampler "DiffuseSampler"
               OpName %in_var_POSITION0 "in.var.POSITION0"
               OpDecorate %in_var_POSITION0 Location 0
               OpDecorate %Globals DescriptorSet 0
               OpDecorate %Globals Binding 0
               OpDecorate %DiffuseTexture DescriptorSet 0
               OpDecorate %DiffuseTexture Binding 32
               OpDecorate %DiffuseSampler DescriptorSet 0
               OpDecorate %DiffuseSampler Binding 64
               OpMemberDecorate %type_Globals 0 Offset 0
               OpMemberDecorate %type_Globals 1 Offset 64
      %float = OpTypeFloat 32
    %v4float = OpTypeVector %float 4
    %v2float = OpTypeVector %float 2
%mat4v4float = OpTypeMatrix %v4float 4
%mat4v2float = OpTypeMatrix %v2float 4
%type_Globals = OpTypeStruct %mat4v4float %mat4v2float
%_ptr_Uniform_type_Globals = OpTypePointer Uniform %type_Globals
%type_2d_image = OpTypeImage %float 2D 2 0 0 1 Unknown
%_ptr_UniformConstant_type_2d_image = OpTypePointer UniformConstant %type_2d_image
%type_sampler = OpTypeSampler
%_ptr_UniformConstant_type_sampler = OpTypePointer UniformConstant %type_sampler
%_ptr_Input_v4float = OpTypePointer Input %v4float
    %Globals = OpVariable %_ptr_Uniform_type_Globals Uniform
%DiffuseTexture = OpVariable %_ptr_UniformConstant_type_2d_image UniformConstant
%DiffuseSampler = OpVariable %_ptr_UniformConstant_type_sampler UniformConstant
%in_var_POSITION0 = OpVariable %_ptr_Input_v4float Input
"#;

impl SpirvCompiler for FakeSpirvCompiler {
    fn compile(
        &self,
        _source: &str,
        entry_point: &str,
        _model: &str,
        stage: ShaderStage,
        _macros: &MacroSet,
        request: &SpirvRequest,
    ) -> Result<SpirvOutput, ToolError> {
        self.requests.borrow_mut().push((stage, *request));
        Ok(SpirvOutput {
            binary: format!("spv:{entry_point}").into_bytes(),
            disassembly: SPIRV_LISTING.to_owned(),
            warnings: String::new(),
        })
    }
}

#[test]
fn vulkan_effect_shifts_bindings_and_swaps_matrix_shape() {
    let spirv = FakeSpirvCompiler {
        requests: Rc::new(RefCell::new(Vec::new())),
    };
    let requests = Rc::clone(&spirv.requests);
    let tools = Toolchains {
        spirv: Some(Box::new(spirv)),
        ..Toolchains::default()
    };

    let techniques = vec![technique(
        "Main",
        vec![pass("P0", ("VsMain", "vs_6_0"), ("PsMain", "ps_6_0"))],
    )];
    let compiled = compile_effect("fx source", &techniques, &options(Profile::Vulkan), &tools)
        .expect("effect should compile");

    // Pixel compiles first (pass order), then vertex; each stage gets its
    // own disjoint binding block and the Vulkan clip-space flip.
    let recorded = requests.borrow();
    assert_eq!(recorded.len(), 2);
    let (pixel_stage, pixel_request) = recorded[0];
    assert_eq!(pixel_stage, ShaderStage::Pixel);
    assert_eq!(
        (
            pixel_request.buffer_shift,
            pixel_request.texture_shift,
            pixel_request.sampler_shift
        ),
        (96, 128, 160)
    );
    let (vertex_stage, vertex_request) = recorded[1];
    assert_eq!(vertex_stage, ShaderStage::Vertex);
    assert_eq!(
        (
            vertex_request.buffer_shift,
            vertex_request.texture_shift,
            vertex_request.sampler_shift
        ),
        (0, 32, 64)
    );
    assert!(pixel_request.invert_y && vertex_request.invert_y);

    let effect = &compiled.effect;
    assert_eq!(effect.constant_buffers.len(), 1);
    let buffer = &effect.constant_buffers[0];
    assert_eq!(buffer.name, "Globals");

    // The listing reports the column-major shapes (4x4 and 2x4 columns);
    // storage swaps the 4x2 matrix to rows 4, columns 2.
    let bend = &buffer.parameters()[1];
    assert_eq!(bend.name, "Bend");
    assert_eq!((bend.rows, bend.columns), (4, 2));

    // The sampler pairs with the texture by base name and keeps the shifted
    // descriptor bindings as slots.
    let vs_index = compiled.effect.techniques[0].passes[0]
        .shader_for(ShaderStage::Vertex)
        .unwrap();
    let vs = &effect.shaders[vs_index];
    assert_eq!(vs.samplers.len(), 1);
    assert_eq!(vs.samplers[0].texture_name, "DiffuseTexture");
    assert_eq!(vs.samplers[0].sampler_slot, 64);
    assert_eq!(vs.samplers[0].texture_slot, 32);
    assert_eq!(vs.attributes.len(), 1);
    assert_eq!(vs.attributes[0].name, "POSITION0");
}

struct FakeCrossCompiler;

impl SourceCrossCompiler for FakeCrossCompiler {
    fn cross_compile(
        &self,
        _source: &str,
        entry_point: &str,
        stage: ShaderStage,
        _target: GlslTarget,
        _macros: &MacroSet,
    ) -> Result<CrossCompiledShader, ToolError> {
        let text = format!(
            "#version 120\n// {entry_point}\nvoid main() {{\n    gl_Position = vec4(0.0);\n}}\n"
        );
        let samplers = if stage == ShaderStage::Pixel {
            // One sampler variable used against two textures, both reported
            // at unit 2: not representable on physical units.
            vec![
                SamplerBridge {
                    name: "EnvSampler".to_owned(),
                    texture_name: "EnvDay".to_owned(),
                    kind: SamplerKind::SamplerCube,
                    slot: 2,
                    state: None,
                },
                SamplerBridge {
                    name: "EnvSampler".to_owned(),
                    texture_name: "EnvNight".to_owned(),
                    kind: SamplerKind::SamplerCube,
                    slot: 2,
                    state: None,
                },
            ]
        } else {
            Vec::new()
        };
        Ok(CrossCompiledShader {
            text,
            uniform_blocks: vec![UniformBlock {
                name: "Globals".to_owned(),
                instance_name: None,
                binding: 0,
                uniforms: vec![UniformReflection {
                    name: "WorldViewProjection".to_owned(),
                    type_name: "float".to_owned(),
                    rows: 4,
                    columns: 4,
                    offset: 0,
                }],
            }],
            samplers,
            attributes: if stage == ShaderStage::Vertex {
                vec![AttributeReflection {
                    name: "attr_position".to_owned(),
                    semantic: "POSITION".to_owned(),
                    semantic_index: 0,
                    location: 0,
                }]
            } else {
                Vec::new()
            },
            warnings: String::new(),
        })
    }
}

#[test]
fn opengl_effect_patches_source_and_spreads_sampler_slots() {
    let tools = Toolchains {
        cross: Some(Box::new(FakeCrossCompiler)),
        ..Toolchains::default()
    };
    let techniques = vec![technique(
        "Main",
        vec![pass("P0", ("VsMain", "vs_3_0"), ("PsMain", "ps_3_0"))],
    )];
    let compiled = compile_effect("fx source", &techniques, &options(Profile::OpenGl), &tools)
        .expect("effect should compile");
    let effect = &compiled.effect;

    let p0 = &effect.techniques[0].passes[0];
    let vs = &effect.shaders[p0.shader_for(ShaderStage::Vertex).unwrap()];
    let ps = &effect.shaders[p0.shader_for(ShaderStage::Pixel).unwrap()];

    // The vertex text gets the clip-space fixup; the pixel text does not.
    let vs_text = std::str::from_utf8(&vs.code).unwrap();
    assert!(vs_text.contains("uniform vec4 posFixup;"));
    assert!(vs_text.contains("posFixup.zw"));
    let ps_text = std::str::from_utf8(&ps.code).unwrap();
    assert!(!ps_text.contains("posFixup"));

    // The contended unit is kept once; the other pairing moves to a free one.
    let slots: Vec<u8> = ps.samplers.iter().map(|s| s.texture_slot).collect();
    assert!(slots.contains(&2));
    assert_ne!(slots[0], slots[1]);

    // Both texture parameters land in the effect-wide table.
    let names: Vec<&str> = effect.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["WorldViewProjection", "EnvDay", "EnvNight"]);
    assert_eq!(effect.parameters[1].ty, ParameterType::TextureCube);
}

struct FakeTranslator;

impl BytecodeTranslator for FakeTranslator {
    fn translate(
        &self,
        _bytecode: &[u8],
        stage: ShaderStage,
    ) -> Result<TranslatedShader, ToolError> {
        Ok(TranslatedShader {
            text: "void main() {\n    gl_Position = vec4(0.0);\n}\n".to_owned(),
            attributes: if stage == ShaderStage::Vertex {
                vec![AttributeReflection {
                    name: "vs_v0".to_owned(),
                    semantic: "POSITION".to_owned(),
                    semantic_index: 0,
                    location: 0,
                }]
            } else {
                Vec::new()
            },
            warnings: "packing order adjusted".to_owned(),
        })
    }
}

#[test]
fn legacy_opengl_effect_reads_the_constant_table() {
    let tools = Toolchains {
        bytecode: Some(Box::new(FakeBytecodeCompiler {
            legacy: true,
            ..FakeBytecodeCompiler::default()
        })),
        translator: Some(Box::new(FakeTranslator)),
        ..Toolchains::default()
    };
    let techniques = vec![technique(
        "Main",
        vec![pass("P0", ("VsMain", "vs_3_0"), ("PsMain", "ps_3_0"))],
    )];
    let compiled = compile_effect(
        "fx source",
        &techniques,
        &options(Profile::OpenGlLegacy),
        &tools,
    )
    .expect("effect should compile");
    let effect = &compiled.effect;

    // Registers c0..c3: a 64-byte implicit buffer.
    assert_eq!(effect.constant_buffers.len(), 1);
    let buffer = &effect.constant_buffers[0];
    assert_eq!(buffer.size, 64);
    assert_eq!(buffer.parameters()[0].name, "WorldViewProj");

    // The sampler register becomes a binding paired by naming convention.
    let p0 = &effect.techniques[0].passes[0];
    let vs = &effect.shaders[p0.shader_for(ShaderStage::Vertex).unwrap()];
    assert_eq!(vs.samplers.len(), 1);
    assert_eq!(vs.samplers[0].name, "DiffuseSampler");
    assert_eq!(vs.samplers[0].texture_name, "Diffuse");
    assert_eq!(vs.samplers[0].sampler_slot, 1);
    assert!(std::str::from_utf8(&vs.code).unwrap().contains("posFixup"));

    // Translator warnings surface alongside compiler warnings.
    assert!(compiled.warnings.contains("packing order adjusted"));
}

#[test]
fn an_effect_without_techniques_is_rejected() {
    let tools = Toolchains::default();
    let err = compile_effect("fx source", &[], &options(Profile::DirectX11), &tools).unwrap_err();
    assert!(matches!(err, CompileError::NoTechniques), "{err}");
}

#[test]
fn a_missing_toolchain_is_a_structured_error() {
    let tools = Toolchains::default();
    let techniques = vec![technique(
        "Main",
        vec![pass("P0", ("VsMain", "vs_4_0"), ("PsMain", "ps_4_0"))],
    )];
    let err = compile_effect("fx source", &techniques, &options(Profile::DirectX11), &tools)
        .unwrap_err();
    assert!(
        matches!(err, CompileError::MissingToolchain { profile: "DirectX11", .. }),
        "{err}"
    );
}

#[test]
fn a_failing_tool_aborts_with_its_error_text() {
    let tools = Toolchains {
        bytecode: Some(Box::new(FailingCompiler)),
        ..Toolchains::default()
    };
    let techniques = vec![technique(
        "Main",
        vec![pass("P0", ("VsMain", "vs_4_0"), ("PsMain", "ps_4_0"))],
    )];
    let err = compile_effect("fx source", &techniques, &options(Profile::DirectX11), &tools)
        .unwrap_err();
    match err {
        CompileError::ShaderCompile { detail, .. } => {
            assert!(detail.contains("error X3000"), "{detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn shader_model_gate_runs_before_any_backend() {
    // No toolchains at all: validation must fail first.
    let tools = Toolchains::default();
    let techniques = vec![technique(
        "Main",
        vec![pass("P0", ("VsMain", "vs_3_0"), ("PsMain", "ps_4_0"))],
    )];
    let err = compile_effect("fx source", &techniques, &options(Profile::DirectX11), &tools)
        .unwrap_err();
    assert!(matches!(err, CompileError::ShaderModel { .. }), "{err}");
}
