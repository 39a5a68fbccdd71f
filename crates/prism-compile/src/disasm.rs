//! Line-oriented SPIR-V disassembly parsing.
//!
//! The SPIR-V compiler cannot be asked for structured reflection, but its
//! human-readable disassembly listing carries everything the pipeline needs:
//! `OpName`/`OpMemberName` for identifiers, `OpDecorate`/`OpMemberDecorate`
//! for descriptor bindings, input locations, and member offsets, and the
//! `OpType*`/`OpVariable` instructions for value shapes. This module walks
//! that text once and produces a symbol table; nothing downstream ever sees
//! the listing format, so a structured reflection API can replace this parser
//! without touching the parameter model.
//!
//! Only the instructions named above are interpreted; every other line is
//! skipped. A line that *is* interpreted but does not parse is a hard error,
//! surfaced as "shader failed to compile".

use std::collections::HashMap;

use thiserror::Error;

/// Errors raised while parsing a disassembly listing.
#[derive(Debug, Clone, Error)]
pub enum DisasmError {
    /// An interpreted line is missing an operand or carries a bad token.
    #[error("disassembly line {line}: {detail}")]
    Malformed {
        /// 1-based line number in the listing.
        line: usize,
        /// What went wrong.
        detail: String,
    },
    /// The listing parsed, but its ids do not resolve into usable symbols.
    #[error("disassembly symbol table: {0}")]
    Symbol(String),
}

/// The scalar component type of a block member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SpirvScalar {
    Bool,
    Int,
    Uint,
    Float,
}

impl SpirvScalar {
    /// The cross-compiler-style type spelling for this scalar.
    pub fn type_name(self) -> &'static str {
        match self {
            SpirvScalar::Bool => "bool",
            SpirvScalar::Int => "int",
            SpirvScalar::Uint => "uint",
            SpirvScalar::Float => "float",
        }
    }
}

/// Texture dimensionality as spelled in `OpTypeImage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SpirvImageDim {
    Dim1D,
    Dim2D,
    Dim3D,
    Cube,
}

/// One member of a uniform-block struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpirvMember {
    /// Member name.
    pub name: String,
    /// Byte offset inside the block (`OpMemberDecorate ... Offset`).
    pub offset: u32,
    /// Scalar component type.
    pub scalar: SpirvScalar,
    /// Vector size (matrix column height in the column-major convention).
    pub rows: u8,
    /// Matrix column count; 1 for vectors and scalars.
    pub columns: u8,
    /// Array element count, 0 for non-arrays.
    pub elements: u32,
}

/// One uniform block: a `Uniform`-storage variable of struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpirvBlock {
    /// Struct type name with the compiler's `type.` prefix stripped.
    pub name: String,
    /// Variable (instance) name.
    pub instance_name: String,
    /// Descriptor set.
    pub set: u32,
    /// Binding inside the set.
    pub binding: u32,
    /// Members in declaration order.
    pub members: Vec<SpirvMember>,
}

/// What an opaque `UniformConstant` variable is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpirvObjectKind {
    /// A sampled texture.
    Texture(SpirvImageDim),
    /// A standalone sampler.
    Sampler,
}

/// An opaque texture/sampler object with its descriptor binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpirvObject {
    /// Variable name.
    pub name: String,
    /// Object kind.
    pub kind: SpirvObjectKind,
    /// Descriptor set.
    pub set: u32,
    /// Binding inside the set.
    pub binding: u32,
}

/// A stage input with an assigned location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpirvInput {
    /// Variable name with the compiler's `in.var.` prefix stripped.
    pub name: String,
    /// Input location.
    pub location: u32,
}

/// Everything the SPIR-V backend recovers from one disassembly listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpirvSymbols {
    /// Uniform blocks in listing order.
    pub blocks: Vec<SpirvBlock>,
    /// Opaque texture/sampler objects in listing order.
    pub objects: Vec<SpirvObject>,
    /// Stage inputs that carry a location, in listing order.
    pub inputs: Vec<SpirvInput>,
}

#[derive(Debug, Clone)]
enum TypeDef {
    Bool,
    Int { signed: bool },
    Float,
    Vector { component: String, count: u32 },
    Matrix { column: String, count: u32 },
    Array { element: String, length: String },
    Struct { members: Vec<String> },
    Image { dim: SpirvImageDim },
    Sampler,
    SampledImage { image: String },
    Pointer { pointee: String },
}

#[derive(Default)]
struct Listing {
    names: HashMap<String, String>,
    member_names: HashMap<(String, u32), String>,
    member_offsets: HashMap<(String, u32), u32>,
    sets: HashMap<String, u32>,
    bindings: HashMap<String, u32>,
    locations: HashMap<String, u32>,
    types: HashMap<String, TypeDef>,
    constants: HashMap<String, u32>,
    // (id, pointer type id, storage class), in listing order.
    variables: Vec<(String, String, String)>,
}

/// Parses one disassembly listing into a symbol table.
pub fn parse(disassembly: &str) -> Result<SpirvSymbols, DisasmError> {
    let mut listing = Listing::default();

    for (index, raw) in disassembly.lines().enumerate() {
        let line = index + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with(';') {
            continue;
        }

        match text.split_once(" = ") {
            Some((result, rest)) => {
                let id = id_token(result.trim(), line)?;
                parse_result_line(&mut listing, id, rest.trim(), line)?;
            }
            None => parse_bare_line(&mut listing, text, line)?,
        }
    }

    resolve(&listing)
}

fn parse_result_line(
    listing: &mut Listing,
    id: String,
    rest: &str,
    line: usize,
) -> Result<(), DisasmError> {
    let mut tokens = rest.split_whitespace();
    let Some(op) = tokens.next() else {
        return Err(malformed(line, "missing instruction after `=`"));
    };

    match op {
        "OpTypeBool" => {
            listing.types.insert(id, TypeDef::Bool);
        }
        "OpTypeInt" => {
            let _width = next_int(&mut tokens, line, "OpTypeInt width")?;
            let signed = next_int(&mut tokens, line, "OpTypeInt signedness")? != 0;
            listing.types.insert(id, TypeDef::Int { signed });
        }
        "OpTypeFloat" => {
            listing.types.insert(id, TypeDef::Float);
        }
        "OpTypeVector" => {
            let component = next_id(&mut tokens, line, "OpTypeVector component")?;
            let count = next_int(&mut tokens, line, "OpTypeVector count")?;
            listing.types.insert(id, TypeDef::Vector { component, count });
        }
        "OpTypeMatrix" => {
            let column = next_id(&mut tokens, line, "OpTypeMatrix column type")?;
            let count = next_int(&mut tokens, line, "OpTypeMatrix column count")?;
            listing.types.insert(id, TypeDef::Matrix { column, count });
        }
        "OpTypeArray" => {
            let element = next_id(&mut tokens, line, "OpTypeArray element")?;
            let length = next_id(&mut tokens, line, "OpTypeArray length")?;
            listing.types.insert(id, TypeDef::Array { element, length });
        }
        "OpTypeStruct" => {
            let mut members = Vec::new();
            for token in tokens {
                members.push(id_token(token, line)?);
            }
            listing.types.insert(id, TypeDef::Struct { members });
        }
        "OpTypeImage" => {
            let _sampled_type = next_id(&mut tokens, line, "OpTypeImage sampled type")?;
            let dim = match tokens.next() {
                Some("1D") => SpirvImageDim::Dim1D,
                Some("2D") => SpirvImageDim::Dim2D,
                Some("3D") => SpirvImageDim::Dim3D,
                Some("Cube") => SpirvImageDim::Cube,
                Some(other) => {
                    return Err(malformed(line, format!("unknown image dimension {other:?}")))
                }
                None => return Err(malformed(line, "OpTypeImage is missing its dimension")),
            };
            listing.types.insert(id, TypeDef::Image { dim });
        }
        "OpTypeSampler" => {
            listing.types.insert(id, TypeDef::Sampler);
        }
        "OpTypeSampledImage" => {
            let image = next_id(&mut tokens, line, "OpTypeSampledImage image")?;
            listing.types.insert(id, TypeDef::SampledImage { image });
        }
        "OpTypePointer" => {
            // The storage class repeats on the OpVariable line, which is the
            // one the resolver reads.
            let _storage = tokens
                .next()
                .ok_or_else(|| malformed(line, "OpTypePointer is missing its storage class"))?;
            let pointee = next_id(&mut tokens, line, "OpTypePointer pointee")?;
            listing.types.insert(id, TypeDef::Pointer { pointee });
        }
        "OpConstant" => {
            let _ty = next_id(&mut tokens, line, "OpConstant type")?;
            // Only integer constants (array lengths) are of interest; float
            // constants simply fail the parse and are skipped.
            if let Some(value) = tokens.next().and_then(|t| t.parse::<u32>().ok()) {
                listing.constants.insert(id, value);
            }
        }
        "OpVariable" => {
            let pointer = next_id(&mut tokens, line, "OpVariable pointer type")?;
            let storage = tokens
                .next()
                .ok_or_else(|| malformed(line, "OpVariable is missing its storage class"))?
                .to_owned();
            listing.variables.push((id, pointer, storage));
        }
        _ => {}
    }
    Ok(())
}

fn parse_bare_line(listing: &mut Listing, text: &str, line: usize) -> Result<(), DisasmError> {
    let mut tokens = text.split_whitespace();
    let Some(op) = tokens.next() else {
        return Ok(());
    };

    match op {
        "OpName" => {
            let id = next_id(&mut tokens, line, "OpName target")?;
            let name = quoted_tail(text, line)?;
            listing.names.insert(id, name);
        }
        "OpMemberName" => {
            let id = next_id(&mut tokens, line, "OpMemberName target")?;
            let member = next_int(&mut tokens, line, "OpMemberName member index")?;
            let name = quoted_tail(text, line)?;
            listing.member_names.insert((id, member), name);
        }
        "OpDecorate" => {
            let id = next_id(&mut tokens, line, "OpDecorate target")?;
            match tokens.next() {
                Some("DescriptorSet") => {
                    let set = next_int(&mut tokens, line, "DescriptorSet value")?;
                    listing.sets.insert(id, set);
                }
                Some("Binding") => {
                    let binding = next_int(&mut tokens, line, "Binding value")?;
                    listing.bindings.insert(id, binding);
                }
                Some("Location") => {
                    let location = next_int(&mut tokens, line, "Location value")?;
                    listing.locations.insert(id, location);
                }
                Some(_) => {}
                None => return Err(malformed(line, "OpDecorate is missing its decoration")),
            }
        }
        "OpMemberDecorate" => {
            let id = next_id(&mut tokens, line, "OpMemberDecorate target")?;
            let member = next_int(&mut tokens, line, "OpMemberDecorate member index")?;
            match tokens.next() {
                Some("Offset") => {
                    let offset = next_int(&mut tokens, line, "Offset value")?;
                    listing.member_offsets.insert((id, member), offset);
                }
                Some(_) => {}
                None => return Err(malformed(line, "OpMemberDecorate is missing its decoration")),
            }
        }
        _ => {}
    }
    Ok(())
}

fn resolve(listing: &Listing) -> Result<SpirvSymbols, DisasmError> {
    let mut symbols = SpirvSymbols::default();

    for (id, pointer, storage) in &listing.variables {
        let pointee = match listing.types.get(pointer) {
            Some(TypeDef::Pointer { pointee, .. }) => pointee,
            _ => continue,
        };
        let name = listing.names.get(id).cloned().unwrap_or_else(|| id.clone());

        match storage.as_str() {
            "Uniform" => {
                let Some(TypeDef::Struct { members }) = listing.types.get(pointee) else {
                    continue;
                };
                let struct_name = listing
                    .names
                    .get(pointee)
                    .map(|n| n.strip_prefix("type.").unwrap_or(n).to_owned())
                    .unwrap_or_else(|| name.clone());

                let mut block = SpirvBlock {
                    name: struct_name,
                    instance_name: name,
                    set: listing.sets.get(id).copied().unwrap_or(0),
                    binding: listing.bindings.get(id).copied().unwrap_or(0),
                    members: Vec::with_capacity(members.len()),
                };
                for (index, member_type) in members.iter().enumerate() {
                    let index = index as u32;
                    let member_name = listing
                        .member_names
                        .get(&(pointee.clone(), index))
                        .cloned()
                        .unwrap_or_else(|| format!("_{index}"));
                    let offset = listing
                        .member_offsets
                        .get(&(pointee.clone(), index))
                        .copied()
                        .unwrap_or(0);
                    let shape = member_shape(listing, member_type)?;
                    block.members.push(SpirvMember {
                        name: member_name,
                        offset,
                        scalar: shape.scalar,
                        rows: shape.rows,
                        columns: shape.columns,
                        elements: shape.elements,
                    });
                }
                symbols.blocks.push(block);
            }
            "UniformConstant" => {
                let kind = match listing.types.get(pointee) {
                    Some(TypeDef::Image { dim }) => SpirvObjectKind::Texture(*dim),
                    Some(TypeDef::SampledImage { image }) => match listing.types.get(image) {
                        Some(TypeDef::Image { dim }) => SpirvObjectKind::Texture(*dim),
                        _ => continue,
                    },
                    Some(TypeDef::Sampler) => SpirvObjectKind::Sampler,
                    _ => continue,
                };
                symbols.objects.push(SpirvObject {
                    name,
                    kind,
                    set: listing.sets.get(id).copied().unwrap_or(0),
                    binding: listing.bindings.get(id).copied().unwrap_or(0),
                });
            }
            "Input" => {
                if let Some(location) = listing.locations.get(id) {
                    let name = name.strip_prefix("in.var.").unwrap_or(&name).to_owned();
                    symbols.inputs.push(SpirvInput {
                        name,
                        location: *location,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(symbols)
}

struct MemberShape {
    scalar: SpirvScalar,
    rows: u8,
    columns: u8,
    elements: u32,
}

fn member_shape(listing: &Listing, type_id: &str) -> Result<MemberShape, DisasmError> {
    fn inner(listing: &Listing, type_id: &str, depth: u32) -> Result<MemberShape, DisasmError> {
        if depth > 4 {
            return Err(DisasmError::Symbol(format!("type %{type_id} nests too deeply")));
        }
        match listing.types.get(type_id) {
            Some(TypeDef::Bool) => Ok(MemberShape {
                scalar: SpirvScalar::Bool,
                rows: 1,
                columns: 1,
                elements: 0,
            }),
            Some(TypeDef::Int { signed }) => Ok(MemberShape {
                scalar: if *signed {
                    SpirvScalar::Int
                } else {
                    SpirvScalar::Uint
                },
                rows: 1,
                columns: 1,
                elements: 0,
            }),
            Some(TypeDef::Float) => Ok(MemberShape {
                scalar: SpirvScalar::Float,
                rows: 1,
                columns: 1,
                elements: 0,
            }),
            Some(TypeDef::Vector { component, count }) => {
                let component = inner(listing, component, depth + 1)?;
                Ok(MemberShape {
                    scalar: component.scalar,
                    rows: (*count).min(255) as u8,
                    columns: 1,
                    elements: 0,
                })
            }
            Some(TypeDef::Matrix { column, count }) => {
                let column = inner(listing, column, depth + 1)?;
                Ok(MemberShape {
                    scalar: column.scalar,
                    rows: column.rows,
                    columns: (*count).min(255) as u8,
                    elements: 0,
                })
            }
            Some(TypeDef::Array { element, length }) => {
                let element = inner(listing, element, depth + 1)?;
                let length = listing.constants.get(length).copied().ok_or_else(|| {
                    DisasmError::Symbol(format!("array length %{length} is not a known constant"))
                })?;
                Ok(MemberShape {
                    elements: length,
                    ..element
                })
            }
            Some(_) | None => Err(DisasmError::Symbol(format!(
                "block member references unusable type %{type_id}"
            ))),
        }
    }
    inner(listing, type_id, 0)
}

fn malformed(line: usize, detail: impl Into<String>) -> DisasmError {
    DisasmError::Malformed {
        line,
        detail: detail.into(),
    }
}

fn id_token(token: &str, line: usize) -> Result<String, DisasmError> {
    token
        .strip_prefix('%')
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| malformed(line, format!("expected an %id token, found {token:?}")))
}

fn next_id<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<String, DisasmError> {
    let token = tokens
        .next()
        .ok_or_else(|| malformed(line, format!("missing {what}")))?;
    id_token(token, line)
}

fn next_int<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<u32, DisasmError> {
    let token = tokens
        .next()
        .ok_or_else(|| malformed(line, format!("missing {what}")))?;
    token
        .parse()
        .map_err(|_| malformed(line, format!("{what} {token:?} is not an integer")))
}

fn quoted_tail(text: &str, line: usize) -> Result<String, DisasmError> {
    let start = text
        .find('"')
        .ok_or_else(|| malformed(line, "missing opening quote"))?;
    let tail = &text[start + 1..];
    let end = tail
        .rfind('"')
        .filter(|&end| end > 0 || tail.starts_with('"'))
        .ok_or_else(|| malformed(line, "missing closing quote"))?;
    Ok(tail[..end].to_owned())
}
