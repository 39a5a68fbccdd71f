//! Constant-buffer normalization.
//!
//! Every backend reports uniforms in a different native shape: DXBC `RDEF`
//! reflection, legacy `CTAB` register tables, or the cross-compiler's
//! uniform-block listing. All of them are folded into the same
//! [`ConstantBuffer`] normal form here: parameters ascending by byte offset,
//! a parallel offset list, and a size covering the furthest parameter end.
//!
//! Conventions differ per source and are corrected on the way in:
//! - `RDEF` default-value blobs are row-major; matrix blobs are transposed to
//!   the column-major storage order the runtime uploads.
//! - `CTAB` constants are keyed by register index over 16-byte registers.
//! - SPIR-V-sourced uniform blocks report column-major rows/columns, which
//!   are swapped to the row-major convention used everywhere else.

use thiserror::Error;
use tracing::warn;

use prism_dxbc::rdef::input_type;
use prism_dxbc::{ConstantTable, CtabConstant, RdefChunk, RdefType, RegisterSet};
use prism_effect::{
    parse_array_suffix, ConstantBuffer, EffectError, Parameter, ParameterClass, ParameterType,
};

use crate::toolchain::UniformBlock;

/// Byte stride of one legacy constant register (bool/int4/float4 sets alike).
const REGISTER_SIZE: u32 = 16;

/// Errors raised while folding native reflection into the parameter model.
///
/// These are all fatal: the model has no representation for a value it does
/// not understand, and a buffer built around a guess would feed the runtime
/// garbage offsets.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A reflected variable carries a class code outside the model.
    #[error("unsupported class code {class} on variable {name:?}")]
    UnsupportedClass {
        /// Variable name.
        name: String,
        /// Raw class code.
        class: u32,
    },
    /// A reflected variable carries a type the model cannot represent.
    #[error("unsupported type {ty:?} on variable {name:?}")]
    UnsupportedType {
        /// Variable name.
        name: String,
        /// The backend's spelling of the type.
        ty: String,
    },
    /// A legacy constant lives in a register set the model does not cover.
    #[error("unsupported register set {set} on constant {name:?}")]
    UnsupportedRegisterSet {
        /// Constant name.
        name: String,
        /// Raw register-set code.
        set: u16,
    },
    /// A bound resource has a kind the model cannot represent.
    #[error("unsupported resource kind {kind} on resource {name:?}")]
    UnsupportedResourceKind {
        /// Resource name.
        name: String,
        /// Raw input-type code.
        kind: u32,
    },
    /// An array suffix embedded in a reflected name is malformed.
    #[error(transparent)]
    ArraySyntax(#[from] EffectError),
}

/// Builds constant buffers from DXBC `RDEF` reflection.
///
/// Walks every buffer's variables, resolving nested struct/array types
/// recursively and copying default-value bytes. Matrix defaults arrive
/// row-major and are stored transposed.
pub fn from_rdef(rdef: &RdefChunk) -> Result<Vec<ConstantBuffer>, NormalizeError> {
    let mut buffers = Vec::with_capacity(rdef.constant_buffers.len());
    for (index, cb) in rdef.constant_buffers.iter().enumerate() {
        let mut buffer = ConstantBuffer::new(cb.name.clone());
        buffer.binding_slot = rdef
            .bound_resources
            .iter()
            .find(|r| r.input_type == input_type::CBUFFER && r.name == cb.name)
            .map(|r| r.bind_point)
            .unwrap_or(index as u32);

        for variable in &cb.variables {
            let mut parameter = parameter_from_type(
                &variable.name,
                &variable.ty,
                variable.start_offset,
                &variable.default_value,
            )?;
            parameter.buffer_index = Some(index);
            buffer.add_parameter(parameter);
        }

        // The declared size includes trailing register padding the parameter
        // spans alone cannot reproduce.
        buffer.size = buffer.size.max(cb.size);
        buffers.push(buffer);
    }
    Ok(buffers)
}

fn parameter_from_type(
    name: &str,
    ty: &RdefType,
    offset: u32,
    default: &[u8],
) -> Result<Parameter, NormalizeError> {
    if ty.elements > 1 {
        let element_ty = RdefType {
            elements: 0,
            ..ty.clone()
        };
        let stride = align16(type_span(&element_ty));
        let span = type_span(&element_ty) as usize;

        let mut array = element_parameter(name, &element_ty, offset, &[])?;
        array.data.clear();
        for i in 0..u32::from(ty.elements) {
            let start = (i * stride) as usize;
            let slice = slice_or_empty(default, start, span);
            let element = element_parameter(name, &element_ty, offset + i * stride, slice)?;
            array.data.extend_from_slice(&element.data);
            array.elements.push(element);
        }
        return Ok(array);
    }

    element_parameter(name, ty, offset, default)
}

fn element_parameter(
    name: &str,
    ty: &RdefType,
    offset: u32,
    default: &[u8],
) -> Result<Parameter, NormalizeError> {
    let class = class_from_code(name, u32::from(ty.class))?;

    if class == ParameterClass::Struct {
        let mut parameter = Parameter::new(name, ParameterClass::Struct, ParameterType::Void);
        parameter.buffer_offset = offset;
        for (member_name, member_offset, member_ty) in &ty.members {
            let span = type_span(member_ty) as usize;
            let slice = slice_or_empty(default, *member_offset as usize, span);
            let member =
                parameter_from_type(member_name, member_ty, offset + member_offset, slice)?;
            parameter.members.push(member);
        }
        return Ok(parameter);
    }

    let scalar = scalar_from_code(name, u32::from(ty.base_type))?;
    let mut parameter = Parameter::new(name, class, scalar);
    parameter.rows = ty.rows.min(255) as u8;
    parameter.columns = ty.columns.min(255) as u8;
    parameter.buffer_offset = offset;

    // The value blob is always rows * columns * 4 bytes, zero-filled when the
    // source declares no default.
    let len = u32::from(parameter.rows) * u32::from(parameter.columns) * 4;
    let mut data = default.to_vec();
    data.resize(len as usize, 0);
    if parameter.rows > 1 && parameter.columns > 1 {
        data = transpose_matrix(&data, parameter.rows, parameter.columns);
    }
    parameter.data = data;
    Ok(parameter)
}

/// Builds the single implicit buffer from a legacy `CTAB` constant table.
///
/// Constants are keyed by register index over 16-byte registers, rebased to
/// the lowest used register; the buffer spans `(max - min) * 16` bytes.
/// Symbols are visited in packing order (arrays first, then register order),
/// matching the native translator's register allocation. Sampler-set entries
/// are not constants and are skipped; the backend reads them separately.
pub fn from_constant_table(table: &ConstantTable) -> Result<ConstantBuffer, NormalizeError> {
    let mut constants: Vec<&CtabConstant> = Vec::with_capacity(table.constants.len());
    for constant in &table.constants {
        match RegisterSet::from_code(constant.register_set) {
            Some(RegisterSet::Sampler) => {}
            Some(_) => constants.push(constant),
            None => {
                return Err(NormalizeError::UnsupportedRegisterSet {
                    name: constant.name.clone(),
                    set: constant.register_set,
                })
            }
        }
    }
    constants.sort_by(|a, b| {
        (b.elements > 1)
            .cmp(&(a.elements > 1))
            .then(a.register_index.cmp(&b.register_index))
    });

    let min_register = constants
        .iter()
        .map(|c| u32::from(c.register_index))
        .min()
        .unwrap_or(0);
    let max_register = constants
        .iter()
        .map(|c| u32::from(c.register_index) + u32::from(c.register_count))
        .max()
        .unwrap_or(min_register);

    let mut buffer = ConstantBuffer::new("$Globals");
    for constant in constants {
        let offset = (u32::from(constant.register_index) - min_register) * REGISTER_SIZE;
        let mut parameter = parameter_from_ctab(constant, offset)?;
        parameter.buffer_index = Some(0);
        buffer.add_parameter(parameter);
    }
    buffer.size = buffer.size.max((max_register - min_register) * REGISTER_SIZE);
    Ok(buffer)
}

fn parameter_from_ctab(constant: &CtabConstant, offset: u32) -> Result<Parameter, NormalizeError> {
    // Entries without type info are plain float registers.
    let (class, ty, rows, columns) = if constant.rows == 0 {
        (ParameterClass::Vector, ParameterType::Float, 1, 4)
    } else {
        let class = class_from_code(&constant.name, u32::from(constant.class))?;
        let ty = ParameterType::from_code(constant.base_type.min(255) as u8).ok_or_else(|| {
            NormalizeError::UnsupportedType {
                name: constant.name.clone(),
                ty: format!("code {}", constant.base_type),
            }
        })?;
        (
            class,
            ty,
            constant.rows.min(255) as u8,
            constant.columns.min(255) as u8,
        )
    };

    let value_len = (u32::from(rows) * u32::from(columns) * 4) as usize;

    if constant.elements > 1 {
        let elements = u32::from(constant.elements);
        let stride = u32::from(constant.register_count) / elements * REGISTER_SIZE;

        let mut array = Parameter::new(&constant.name, class, ty);
        array.rows = rows;
        array.columns = columns;
        array.buffer_offset = offset;
        for i in 0..elements {
            let mut element = Parameter::new(&constant.name, class, ty);
            element.rows = rows;
            element.columns = columns;
            element.buffer_offset = offset + i * stride;
            let slice = slice_or_empty(&constant.default_value, (i * stride) as usize, value_len);
            element.data = slice.to_vec();
            element.data.resize(value_len, 0);
            array.data.extend_from_slice(&element.data);
            array.elements.push(element);
        }
        return Ok(array);
    }

    let mut parameter = Parameter::new(&constant.name, class, ty);
    parameter.rows = rows;
    parameter.columns = columns;
    parameter.buffer_offset = offset;
    parameter.data = constant.default_value.clone();
    parameter.data.resize(value_len, 0);
    Ok(parameter)
}

/// Builds constant buffers from cross-compiler uniform-block reflection.
///
/// Parameters are keyed directly by the reported byte offset. Array
/// dimensions embedded in uniform names are parsed off and expanded into
/// per-element sub-parameters with 16-byte-aligned element stride. When
/// `spirv` is set, rows and columns are swapped (the SPIR-V listing reports
/// the column-major shape).
pub fn from_uniform_blocks(
    blocks: &[UniformBlock],
    spirv: bool,
) -> Result<Vec<ConstantBuffer>, NormalizeError> {
    let mut buffers = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.iter().enumerate() {
        let mut buffer = ConstantBuffer::new(block.name.clone());
        buffer.instance_name = block.instance_name.clone();
        buffer.binding_slot = block.binding;

        for uniform in &block.uniforms {
            let (name, dims) = parse_array_suffix(&uniform.name)?;
            let ty = scalar_from_name(&name, &uniform.type_name)?;

            let (rows, columns) = if spirv {
                (uniform.columns, uniform.rows)
            } else {
                (uniform.rows, uniform.columns)
            };
            let class = match (rows, columns) {
                (1, 1) => ParameterClass::Scalar,
                (1, _) => ParameterClass::Vector,
                _ => ParameterClass::MatrixRows,
            };

            let value_len = (u32::from(rows) * u32::from(columns) * 4) as usize;
            let element_count: u32 = dims.iter().product();
            if element_count > 1 {
                let stride = align16(value_len as u32);

                let mut array = Parameter::new(&name, class, ty);
                array.rows = rows;
                array.columns = columns;
                array.buffer_index = Some(index);
                array.buffer_offset = uniform.offset;
                for i in 0..element_count {
                    let mut element = Parameter::new(&name, class, ty);
                    element.rows = rows;
                    element.columns = columns;
                    element.buffer_offset = uniform.offset + i * stride;
                    element.data = vec![0; value_len];
                    array.data.extend_from_slice(&element.data);
                    array.elements.push(element);
                }
                buffer.add_parameter(array);
                // Every element is padded out to its aligned stride.
                buffer.size = buffer.size.max(uniform.offset + element_count * stride);
            } else {
                let mut parameter = Parameter::new(&name, class, ty);
                parameter.rows = rows;
                parameter.columns = columns;
                parameter.buffer_index = Some(index);
                parameter.buffer_offset = uniform.offset;
                parameter.data = vec![0; value_len];
                buffer.add_parameter(parameter);
            }
        }

        buffers.push(buffer);
    }
    Ok(buffers)
}

fn class_from_code(name: &str, code: u32) -> Result<ParameterClass, NormalizeError> {
    ParameterClass::from_code(code.min(255) as u8).ok_or_else(|| NormalizeError::UnsupportedClass {
        name: name.to_owned(),
        class: code,
    })
}

fn scalar_from_code(name: &str, code: u32) -> Result<ParameterType, NormalizeError> {
    match code {
        0 => Ok(ParameterType::Void),
        1 => Ok(ParameterType::Bool),
        2 => Ok(ParameterType::Int),
        3 => Ok(ParameterType::Float),
        // D3D reflection reports uint as its own base type; the model folds
        // it into Int, matching the 4-byte storage either way.
        19 => Ok(ParameterType::Int),
        other => Err(NormalizeError::UnsupportedType {
            name: name.to_owned(),
            ty: format!("code {other}"),
        }),
    }
}

fn scalar_from_name(name: &str, type_name: &str) -> Result<ParameterType, NormalizeError> {
    match type_name {
        "float" | "half" | "double" => Ok(ParameterType::Float),
        "int" | "uint" => Ok(ParameterType::Int),
        "bool" => Ok(ParameterType::Bool),
        other => Err(NormalizeError::UnsupportedType {
            name: name.to_owned(),
            ty: other.to_owned(),
        }),
    }
}

/// Total byte span of one reflected value, padding interior array elements
/// out to register boundaries.
fn type_span(ty: &RdefType) -> u32 {
    let base = if ty.members.is_empty() {
        u32::from(ty.rows) * u32::from(ty.columns) * 4
    } else {
        ty.members.iter().map(|(_, _, m)| type_span(m)).sum()
    };
    if ty.elements > 1 {
        (u32::from(ty.elements) - 1) * align16(base) + base
    } else {
        base
    }
}

fn align16(value: u32) -> u32 {
    (value + 15) & !15
}

fn slice_or_empty(data: &[u8], start: usize, len: usize) -> &[u8] {
    if data.is_empty() {
        return data;
    }
    let end = (start + len).min(data.len());
    if start >= end {
        warn!(start, len, available = data.len(), "default value blob is shorter than declared");
        return &[];
    }
    &data[start..end]
}

/// Transposes a row-major default-value blob into column-major order.
///
/// Cells are 4 bytes each; the blob must hold `rows * columns` cells.
fn transpose_matrix(data: &[u8], rows: u8, columns: u8) -> Vec<u8> {
    let rows = usize::from(rows);
    let columns = usize::from(columns);
    let mut out = vec![0u8; data.len()];
    for r in 0..rows {
        for c in 0..columns {
            let src = (r * columns + c) * 4;
            let dst = (c * rows + r) * 4;
            if src + 4 <= data.len() && dst + 4 <= out.len() {
                out[dst..dst + 4].copy_from_slice(&data[src..src + 4]);
            }
        }
    }
    out
}
