//! Synthetic container construction for tests.

use crate::fourcc::FourCC;

/// Builds a minimal `DXBC` container holding `chunks` in order.
///
/// The checksum is left zeroed; parsing does not validate it.
pub fn build_container(chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    let header_len = 4 + 16 + 4 + 4 + 4 + 4 * chunks.len();
    let payload: usize = chunks.iter().map(|(_, d)| 8 + d.len()).sum();
    let mut out = Vec::with_capacity(header_len + payload);

    out.extend_from_slice(b"DXBC");
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // total_size, patched below
    out.extend_from_slice(&(chunks.len() as u32).to_le_bytes());

    let table_pos = out.len();
    out.resize(out.len() + 4 * chunks.len(), 0);

    for (i, (fourcc, data)) in chunks.iter().enumerate() {
        let offset = out.len() as u32;
        out[table_pos + i * 4..table_pos + i * 4 + 4].copy_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&fourcc.0);
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }

    let total = out.len() as u32;
    out[24..28].copy_from_slice(&total.to_le_bytes());
    out
}
