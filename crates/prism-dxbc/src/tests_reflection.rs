use pretty_assertions::assert_eq;

use crate::ctab::{parse_ctab_chunk, RegisterSet};
use crate::rdef::{input_type, parse_rdef_chunk, RdefTypeClass};
use crate::signature::parse_signature_chunk;
use crate::DxbcError;

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[test]
fn rdef_parses_cbuffer_variables_and_resources() {
    // Section layout, in order: header, cbuffer entry, resource entries,
    // variable entries, type entries, default data, strings.
    const HEADER: u32 = 28;
    const CB_ENTRY: u32 = HEADER; // 1 entry * 24
    const RES_ENTRIES: u32 = CB_ENTRY + 24; // 2 entries * 32
    const VAR_ENTRIES: u32 = RES_ENTRIES + 64; // 2 entries * 24
    const TYPES: u32 = VAR_ENTRIES + 48; // 2 entries * 16
    const DEFAULTS: u32 = TYPES + 32; // 64 bytes of matrix data
    const STRINGS: u32 = DEFAULTS + 64;

    const S_GLOBALS: u32 = STRINGS; // "Globals\0"
    const S_WORLD: u32 = S_GLOBALS + 8; // "World\0"
    const S_TINT: u32 = S_WORLD + 6; // "Tint\0"
    const S_TEX: u32 = S_TINT + 5; // "DiffuseTex\0"
    const S_SAMP: u32 = S_TEX + 11; // "DiffuseSampler\0"

    let mut chunk = Vec::new();
    push_u32(&mut chunk, 1); // cb count
    push_u32(&mut chunk, CB_ENTRY); // cb offset
    push_u32(&mut chunk, 2); // resource count
    push_u32(&mut chunk, RES_ENTRIES); // resource offset
    push_u32(&mut chunk, 0x0400); // shader version (4.0)
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, 0); // creator offset

    // cbuffer "Globals": 2 variables, 80 bytes.
    push_u32(&mut chunk, S_GLOBALS);
    push_u32(&mut chunk, 2); // variable count
    push_u32(&mut chunk, VAR_ENTRIES);
    push_u32(&mut chunk, 80); // size
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, 0); // buffer type

    // resource "DiffuseTex": texture2D at t0.
    push_u32(&mut chunk, S_TEX);
    push_u32(&mut chunk, input_type::TEXTURE);
    push_u32(&mut chunk, 5); // return type (float)
    push_u32(&mut chunk, crate::rdef::dimension::TEXTURE2D);
    push_u32(&mut chunk, 0); // num samples
    push_u32(&mut chunk, 0); // bind point
    push_u32(&mut chunk, 1); // bind count
    push_u32(&mut chunk, 0); // flags

    // resource "DiffuseSampler": sampler at s0.
    push_u32(&mut chunk, S_SAMP);
    push_u32(&mut chunk, input_type::SAMPLER);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0); // bind point
    push_u32(&mut chunk, 1); // bind count
    push_u32(&mut chunk, 0);

    // variable "World": float4x4 at offset 0 with a default value.
    push_u32(&mut chunk, S_WORLD);
    push_u32(&mut chunk, 0); // start offset
    push_u32(&mut chunk, 64); // size
    push_u32(&mut chunk, 2); // flags (used)
    push_u32(&mut chunk, TYPES);
    push_u32(&mut chunk, DEFAULTS);

    // variable "Tint": float4 at offset 64, no default.
    push_u32(&mut chunk, S_TINT);
    push_u32(&mut chunk, 64);
    push_u32(&mut chunk, 16);
    push_u32(&mut chunk, 2);
    push_u32(&mut chunk, TYPES + 16);
    push_u32(&mut chunk, 0);

    // type: column-major float4x4.
    push_u16(&mut chunk, 3); // class (matrix, column-major)
    push_u16(&mut chunk, 3); // base type (float)
    push_u16(&mut chunk, 4); // rows
    push_u16(&mut chunk, 4); // columns
    push_u16(&mut chunk, 0); // elements
    push_u16(&mut chunk, 0); // member count
    push_u32(&mut chunk, 0); // member offset

    // type: float4 vector.
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 3);
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 4);
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    // default value: identity matrix.
    for row in 0..4u32 {
        for col in 0..4u32 {
            let v: f32 = if row == col { 1.0 } else { 0.0 };
            chunk.extend_from_slice(&v.to_le_bytes());
        }
    }

    chunk.extend_from_slice(b"Globals\0");
    chunk.extend_from_slice(b"World\0");
    chunk.extend_from_slice(b"Tint\0");
    chunk.extend_from_slice(b"DiffuseTex\0");
    chunk.extend_from_slice(b"DiffuseSampler\0");

    let rdef = parse_rdef_chunk(&chunk).expect("RDEF should parse");

    assert_eq!(rdef.creator, None);
    assert_eq!(rdef.constant_buffers.len(), 1);
    let cb = &rdef.constant_buffers[0];
    assert_eq!(cb.name, "Globals");
    assert_eq!(cb.size, 80);
    assert_eq!(cb.variables.len(), 2);

    let world = &cb.variables[0];
    assert_eq!(world.name, "World");
    assert_eq!(world.start_offset, 0);
    assert_eq!(
        RdefTypeClass::from_code(world.ty.class),
        Some(RdefTypeClass::MatrixColumns)
    );
    assert_eq!((world.ty.rows, world.ty.columns), (4, 4));
    assert_eq!(world.default_value.len(), 64);
    assert_eq!(&world.default_value[..4], &1.0f32.to_le_bytes());

    let tint = &cb.variables[1];
    assert_eq!(tint.name, "Tint");
    assert_eq!(tint.start_offset, 64);
    assert!(tint.default_value.is_empty());

    assert_eq!(rdef.bound_resources.len(), 2);
    assert_eq!(rdef.bound_resources[0].name, "DiffuseTex");
    assert_eq!(rdef.bound_resources[0].input_type, input_type::TEXTURE);
    assert_eq!(rdef.bound_resources[1].name, "DiffuseSampler");
    assert_eq!(rdef.bound_resources[1].input_type, input_type::SAMPLER);
}

#[test]
fn rdef_resolves_nested_struct_members() {
    // Layout: header, cbuffer entry, one variable, struct type + 2 member
    // entries + 2 member types, strings.
    const HEADER: u32 = 28;
    const CB_ENTRY: u32 = HEADER;
    const VAR_ENTRY: u32 = CB_ENTRY + 24;
    const STRUCT_TYPE: u32 = VAR_ENTRY + 24;
    const MEMBERS: u32 = STRUCT_TYPE + 16; // 2 entries * 12
    const MEMBER_TYPES: u32 = MEMBERS + 24; // 2 entries * 16
    const STRINGS: u32 = MEMBER_TYPES + 32;

    const S_CB: u32 = STRINGS; // "Lighting\0"
    const S_LIGHT: u32 = S_CB + 9; // "Light\0"
    const S_DIR: u32 = S_LIGHT + 6; // "Direction\0"
    const S_INTENSITY: u32 = S_DIR + 10; // "Intensity\0"

    let mut chunk = Vec::new();
    push_u32(&mut chunk, 1); // cb count
    push_u32(&mut chunk, CB_ENTRY);
    push_u32(&mut chunk, 0); // resource count
    push_u32(&mut chunk, 0); // resource offset
    push_u32(&mut chunk, 0x0400); // shader version
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0); // creator

    push_u32(&mut chunk, S_CB);
    push_u32(&mut chunk, 1); // variable count
    push_u32(&mut chunk, VAR_ENTRY);
    push_u32(&mut chunk, 32); // size
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    push_u32(&mut chunk, S_LIGHT);
    push_u32(&mut chunk, 0); // start offset
    push_u32(&mut chunk, 32); // size
    push_u32(&mut chunk, 2); // flags
    push_u32(&mut chunk, STRUCT_TYPE);
    push_u32(&mut chunk, 0); // no default

    // struct { float3 Direction; float Intensity; }
    push_u16(&mut chunk, 5); // class (struct)
    push_u16(&mut chunk, 0); // base type (void)
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 4);
    push_u16(&mut chunk, 0); // elements
    push_u16(&mut chunk, 2); // member count
    push_u32(&mut chunk, MEMBERS);

    push_u32(&mut chunk, S_DIR);
    push_u32(&mut chunk, MEMBER_TYPES);
    push_u32(&mut chunk, 0); // offset in struct

    push_u32(&mut chunk, S_INTENSITY);
    push_u32(&mut chunk, MEMBER_TYPES + 16);
    push_u32(&mut chunk, 12);

    push_u16(&mut chunk, 1); // vector
    push_u16(&mut chunk, 3); // float
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 3);
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    push_u16(&mut chunk, 0); // scalar
    push_u16(&mut chunk, 3); // float
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    chunk.extend_from_slice(b"Lighting\0");
    chunk.extend_from_slice(b"Light\0");
    chunk.extend_from_slice(b"Direction\0");
    chunk.extend_from_slice(b"Intensity\0");

    let rdef = parse_rdef_chunk(&chunk).expect("RDEF should parse");
    let var = &rdef.constant_buffers[0].variables[0];
    assert_eq!(var.name, "Light");
    assert_eq!(RdefTypeClass::from_code(var.ty.class), Some(RdefTypeClass::Struct));
    assert_eq!(var.ty.members.len(), 2);
    assert_eq!(var.ty.members[0].0, "Direction");
    assert_eq!(var.ty.members[0].1, 0);
    assert_eq!(var.ty.members[1].0, "Intensity");
    assert_eq!(var.ty.members[1].1, 12);
    assert_eq!(var.ty.members[1].2.columns, 1);
}

#[test]
fn rdef_rejects_truncated_chunk() {
    let err = parse_rdef_chunk(&[0u8; 8]).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }), "{err}");
}

#[test]
fn rdef_rejects_unterminated_name_string() {
    const HEADER: u32 = 28;
    let mut chunk = Vec::new();
    push_u32(&mut chunk, 0); // cb count
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0); // resource count
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0x0400);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, HEADER); // creator offset -> no NUL follows
    chunk.extend_from_slice(b"abc"); // deliberately unterminated

    let err = parse_rdef_chunk(&chunk).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }), "{err}");
}

#[test]
fn ctab_parses_constants_with_type_info_and_defaults() {
    // Layout: header, 2 constant entries, 2 type infos, default data, strings.
    const HEADER: u32 = 28;
    const CONSTANTS: u32 = HEADER; // 2 entries * 20
    const TYPE_INFOS: u32 = CONSTANTS + 40; // 2 entries * 16
    const DEFAULTS: u32 = TYPE_INFOS + 32; // 4 registers * 16 bytes
    const STRINGS: u32 = DEFAULTS + 64;

    const S_TARGET: u32 = STRINGS; // "ps_2_0\0"
    const S_WVP: u32 = S_TARGET + 7; // "WorldViewProj\0"
    const S_SAMP: u32 = S_WVP + 14; // "DiffuseSampler\0"

    let mut chunk = Vec::new();
    push_u32(&mut chunk, 28); // declared struct size
    push_u32(&mut chunk, 0); // creator offset
    push_u32(&mut chunk, 0); // version
    push_u32(&mut chunk, 2); // constant count
    push_u32(&mut chunk, CONSTANTS);
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, S_TARGET);

    // "WorldViewProj": c4..c7 in the float4 set, with defaults.
    push_u32(&mut chunk, S_WVP);
    push_u16(&mut chunk, 2); // register set (float4)
    push_u16(&mut chunk, 4); // register index
    push_u16(&mut chunk, 4); // register count
    push_u16(&mut chunk, 0); // reserved
    push_u32(&mut chunk, TYPE_INFOS);
    push_u32(&mut chunk, DEFAULTS);

    // "DiffuseSampler": s0.
    push_u32(&mut chunk, S_SAMP);
    push_u16(&mut chunk, 3); // register set (sampler)
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, TYPE_INFOS + 16);
    push_u32(&mut chunk, 0);

    // float4x4, column-major.
    push_u16(&mut chunk, 3); // class
    push_u16(&mut chunk, 3); // base type
    push_u16(&mut chunk, 4); // rows
    push_u16(&mut chunk, 4); // columns
    push_u16(&mut chunk, 0); // elements
    push_u16(&mut chunk, 0); // struct members
    push_u32(&mut chunk, 0);

    // sampler2D object.
    push_u16(&mut chunk, 4); // class (object)
    push_u16(&mut chunk, 12); // base type (sampler2D)
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 1);
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, 0);

    for i in 0..16u32 {
        chunk.extend_from_slice(&(i as f32).to_le_bytes());
    }

    chunk.extend_from_slice(b"ps_2_0\0");
    chunk.extend_from_slice(b"WorldViewProj\0");
    chunk.extend_from_slice(b"DiffuseSampler\0");

    let ctab = parse_ctab_chunk(&chunk).expect("CTAB should parse");
    assert_eq!(ctab.target.as_deref(), Some("ps_2_0"));
    assert_eq!(ctab.constants.len(), 2);

    let wvp = &ctab.constants[0];
    assert_eq!(wvp.name, "WorldViewProj");
    assert_eq!(RegisterSet::from_code(wvp.register_set), Some(RegisterSet::Float4));
    assert_eq!(wvp.register_index, 4);
    assert_eq!(wvp.register_count, 4);
    assert_eq!((wvp.rows, wvp.columns), (4, 4));
    assert_eq!(wvp.default_value.len(), 64);
    assert_eq!(&wvp.default_value[..4], &0.0f32.to_le_bytes());

    let samp = &ctab.constants[1];
    assert_eq!(samp.name, "DiffuseSampler");
    assert_eq!(RegisterSet::from_code(samp.register_set), Some(RegisterSet::Sampler));
    assert!(samp.default_value.is_empty());
}

#[test]
fn isgn_parses_semantics_and_registers() {
    // Layout: header, 2 entries, strings.
    const HEADER: u32 = 8;
    const ENTRIES: u32 = HEADER; // 2 entries * 24
    const STRINGS: u32 = ENTRIES + 48;

    const S_POSITION: u32 = STRINGS; // "POSITION\0"
    const S_TEXCOORD: u32 = S_POSITION + 9; // "TEXCOORD\0"

    let mut chunk = Vec::new();
    push_u32(&mut chunk, 2); // param count
    push_u32(&mut chunk, ENTRIES); // param offset

    push_u32(&mut chunk, S_POSITION);
    push_u32(&mut chunk, 0); // semantic index
    push_u32(&mut chunk, 0); // system value type
    push_u32(&mut chunk, 3); // component type (float)
    push_u32(&mut chunk, 0); // register
    push_u32(&mut chunk, 0x0F); // mask (xyzw), rw mask, padding

    push_u32(&mut chunk, S_TEXCOORD);
    push_u32(&mut chunk, 1); // semantic index (TEXCOORD1)
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 3);
    push_u32(&mut chunk, 1); // register
    push_u32(&mut chunk, 0x03); // mask (xy)

    chunk.extend_from_slice(b"POSITION\0");
    chunk.extend_from_slice(b"TEXCOORD\0");

    let sig = parse_signature_chunk(&chunk).expect("ISGN should parse");
    assert_eq!(sig.entries.len(), 2);
    assert_eq!(sig.entries[0].semantic_name, "POSITION");
    assert_eq!(sig.entries[0].register, 0);
    assert_eq!(sig.entries[0].mask, 0x0F);
    assert_eq!(sig.entries[1].semantic_name, "TEXCOORD");
    assert_eq!(sig.entries[1].semantic_index, 1);
    assert_eq!(sig.entries[1].register, 1);
}

#[test]
fn ctab_rejects_out_of_bounds_default_value() {
    const HEADER: u32 = 28;
    const CONSTANTS: u32 = HEADER;
    const STRINGS: u32 = CONSTANTS + 20;

    let mut chunk = Vec::new();
    push_u32(&mut chunk, 28);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 1); // constant count
    push_u32(&mut chunk, CONSTANTS);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, 0); // no target

    push_u32(&mut chunk, STRINGS);
    push_u16(&mut chunk, 2);
    push_u16(&mut chunk, 0);
    push_u16(&mut chunk, 4); // claims 4 registers of defaults...
    push_u16(&mut chunk, 0);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, STRINGS); // ...starting where only a name fits

    chunk.extend_from_slice(b"C0\0");

    let err = parse_ctab_chunk(&chunk).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }), "{err}");
}
