//! Debug-chunk stripping.
//!
//! Shipping effects should not carry compiler debug payloads. Stripping
//! rebuilds the container without them; when the blob is not a well-formed
//! container (raw legacy token streams, unknown formats) there is nothing to
//! strip and the caller keeps the full bytecode.

use crate::container::{DxbcContainer, HEADER_LEN};
use crate::fourcc::FourCC;

const DEBUG_CHUNKS: [FourCC; 4] = [FourCC::SDBG, FourCC::SPDB, FourCC::STAT, FourCC::PRIV];

/// Rebuilds `bytes` without debug chunks.
///
/// Returns `None` when the input is not a parseable container or contains no
/// debug chunks; in both cases the original blob should be used as-is.
pub fn strip_debug_chunks(bytes: &[u8]) -> Option<Vec<u8>> {
    let container = DxbcContainer::parse(bytes).ok()?;

    let kept: Vec<_> = container
        .chunks()
        .iter()
        .filter(|c| !DEBUG_CHUNKS.contains(&c.fourcc))
        .collect();
    if kept.len() == container.chunks().len() {
        return None;
    }

    // Rebuild: header + offset table + chunks. The stored checksum is left
    // zeroed; consumers of stripped blobs treat the bytes as opaque.
    let payload: usize = kept.iter().map(|c| 8 + c.data.len()).sum();
    let mut out = Vec::with_capacity(HEADER_LEN + kept.len() * 4 + payload);

    out.extend_from_slice(b"DXBC");
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // total_size, patched below
    out.extend_from_slice(&(kept.len() as u32).to_le_bytes());

    let table_pos = out.len();
    out.resize(out.len() + kept.len() * 4, 0);

    for (i, chunk) in kept.iter().enumerate() {
        let offset = out.len() as u32;
        out[table_pos + i * 4..table_pos + i * 4 + 4].copy_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&chunk.fourcc.0);
        out.extend_from_slice(&(chunk.data.len() as u32).to_le_bytes());
        out.extend_from_slice(chunk.data);
    }

    let total = out.len() as u32;
    out[24..28].copy_from_slice(&total.to_le_bytes());
    Some(out)
}
