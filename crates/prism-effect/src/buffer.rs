use crate::parameter::Parameter;

/// A named uniform block: parameters at fixed byte offsets.
///
/// `parameters` is kept sorted ascending by `buffer_offset`, with
/// `parameter_offsets` as a parallel list, so the serialized layout and the
/// structural-equality check are both order-stable regardless of reflection
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantBuffer {
    /// Block name.
    pub name: String,
    /// Instance name, for backends that bind blocks through an instance.
    pub instance_name: Option<String>,
    /// Binding slot reported by reflection.
    pub binding_slot: u32,
    /// Byte size; recomputed on every insertion.
    pub size: u32,
    /// Indexes into the effect-wide parameter table, parallel to
    /// `parameters`; populated by parameter linking.
    pub parameter_index: Vec<usize>,
    parameters: Vec<Parameter>,
    parameter_offsets: Vec<u32>,
}

impl ConstantBuffer {
    /// An empty buffer with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        ConstantBuffer {
            name: name.into(),
            ..ConstantBuffer::default()
        }
    }

    /// Reconstructs a buffer from its serialized form.
    ///
    /// Wire buffers reference their parameters through the effect-wide table,
    /// so the local parameter list stays empty; the index/offset pairs carry
    /// the layout.
    pub(crate) fn from_wire(name: String, size: u32, pairs: Vec<(usize, u32)>) -> Self {
        let (parameter_index, parameter_offsets) = pairs.into_iter().unzip();
        ConstantBuffer {
            name,
            size,
            parameter_index,
            parameter_offsets,
            ..ConstantBuffer::default()
        }
    }

    /// Parameters in ascending offset order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Byte offsets parallel to [`parameters`](Self::parameters).
    pub fn parameter_offsets(&self) -> &[u32] {
        &self.parameter_offsets
    }

    /// Inserts `parameter` at its `buffer_offset`, keeping ascending order.
    ///
    /// Re-inserting a parameter with a name and offset already present is a
    /// deliberate no-op: the same variable reflected from two stages of one
    /// pass is the same parameter.
    pub fn add_parameter(&mut self, parameter: Parameter) {
        let offset = parameter.buffer_offset;
        if self
            .parameters
            .iter()
            .any(|p| p.buffer_offset == offset && p.name == parameter.name)
        {
            return;
        }

        let at = self
            .parameters
            .partition_point(|p| p.buffer_offset <= offset);
        let end = offset + parameter.byte_size();
        self.parameters.insert(at, parameter);
        self.parameter_offsets.insert(at, offset);
        self.size = self.size.max(end);
    }

    /// Structural equality: identical ordered `(name, type, offset)` tuples.
    ///
    /// This is the dedup key across the whole effect; two blocks reflected
    /// from different shaders collapse to one instance when they agree.
    pub fn same_as(&self, other: &ConstantBuffer) -> bool {
        self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| {
                    a.name == b.name && a.ty == b.ty && a.buffer_offset == b.buffer_offset
                })
    }
}
