use crate::error::DxbcError;
use crate::fourcc::FourCC;
use core::fmt;

pub(crate) const HEADER_LEN: usize = 4 + 16 + 4 + 4 + 4; // magic + checksum + reserved + total_size + chunk_count

// Real containers hold a handful of chunks; this cap only exists to bound the
// offset-table walk on hostile input.
const MAX_CHUNK_COUNT: u32 = 1024;

/// The fixed header of a `DXBC` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxbcHeader {
    /// Stored container checksum (MD5; not validated here).
    pub checksum: [u8; 16],
    /// Declared total size of the container in bytes.
    pub total_size: u32,
    /// Number of chunk offsets following the header.
    pub chunk_count: u32,
}

/// A single chunk within a parsed container.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DxbcChunk<'a> {
    /// Chunk identifier (e.g. `RDEF`, `CTAB`, `SHEX`).
    pub fourcc: FourCC,
    /// Raw chunk payload.
    pub data: &'a [u8],
}

impl fmt::Debug for DxbcChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxbcChunk")
            .field("fourcc", &self.fourcc)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// A parsed `DXBC` container.
///
/// Chunks are validated eagerly at parse time; lookups after a successful
/// parse cannot fail.
#[derive(Debug, Clone)]
pub struct DxbcContainer<'a> {
    header: DxbcHeader,
    chunks: Vec<DxbcChunk<'a>>,
}

impl<'a> DxbcContainer<'a> {
    /// Parses a container from untrusted bytes.
    ///
    /// Every offset and size is validated against the declared `total_size`;
    /// malformed input yields an error, never a panic.
    pub fn parse(bytes: &'a [u8]) -> Result<DxbcContainer<'a>, DxbcError> {
        if bytes.len() < HEADER_LEN {
            return Err(DxbcError::MalformedHeader(format!(
                "need at least {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if &bytes[..4] != FourCC::DXBC.0.as_slice() {
            return Err(DxbcError::MalformedHeader(format!(
                "bad magic {:?}",
                &bytes[..4]
            )));
        }

        let mut checksum = [0u8; 16];
        checksum.copy_from_slice(&bytes[4..20]);

        // bytes[20..24] is a reserved field (always 1); nothing reads it.
        let total_size = read_u32(bytes, 24)?;
        let chunk_count = read_u32(bytes, 28)?;
        if chunk_count > MAX_CHUNK_COUNT {
            return Err(DxbcError::MalformedChunks(format!(
                "chunk_count {chunk_count} exceeds maximum {MAX_CHUNK_COUNT}"
            )));
        }

        let total = total_size as usize;
        if total < HEADER_LEN || total > bytes.len() {
            return Err(DxbcError::MalformedHeader(format!(
                "total_size {total_size} out of range for a {}-byte buffer",
                bytes.len()
            )));
        }
        let bytes = &bytes[..total];

        let table_end = HEADER_LEN
            .checked_add(chunk_count as usize * 4)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                DxbcError::MalformedChunks(format!(
                    "offset table for {chunk_count} chunks exceeds total_size {total_size}"
                ))
            })?;

        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for i in 0..chunk_count as usize {
            let chunk_offset = read_u32(bytes, HEADER_LEN + i * 4)? as usize;
            if chunk_offset < table_end {
                return Err(DxbcError::MalformedChunks(format!(
                    "chunk {i} offset {chunk_offset} points into the header/offset table"
                )));
            }
            let header_end = chunk_offset.checked_add(8).ok_or_else(|| {
                DxbcError::MalformedChunks(format!("chunk {i} offset overflows"))
            })?;
            if header_end > bytes.len() {
                return Err(DxbcError::MalformedChunks(format!(
                    "chunk {i} header at {chunk_offset}..{header_end} is outside total_size {total_size}"
                )));
            }

            let fourcc = FourCC([
                bytes[chunk_offset],
                bytes[chunk_offset + 1],
                bytes[chunk_offset + 2],
                bytes[chunk_offset + 3],
            ]);
            let size = read_u32(bytes, chunk_offset + 4)? as usize;
            let data_end = header_end.checked_add(size).ok_or_else(|| {
                DxbcError::MalformedChunks(format!("chunk {i} size {size} overflows"))
            })?;
            if data_end > bytes.len() {
                return Err(DxbcError::MalformedChunks(format!(
                    "chunk {i} ({fourcc}) data at {header_end}..{data_end} is outside total_size {total_size}"
                )));
            }

            chunks.push(DxbcChunk {
                fourcc,
                data: &bytes[header_end..data_end],
            });
        }

        Ok(DxbcContainer {
            header: DxbcHeader {
                checksum,
                total_size,
                chunk_count,
            },
            chunks,
        })
    }

    /// Returns the parsed container header.
    pub fn header(&self) -> &DxbcHeader {
        &self.header
    }

    /// All chunks in file order.
    pub fn chunks(&self) -> &[DxbcChunk<'a>] {
        &self.chunks
    }

    /// Returns the first chunk matching `fourcc`, if any.
    pub fn chunk(&self, fourcc: FourCC) -> Option<DxbcChunk<'a>> {
        self.chunks.iter().copied().find(|c| c.fourcc == fourcc)
    }

    /// Returns the first shader bytecode chunk (`SHEX` preferred over `SHDR`).
    pub fn shader_chunk(&self) -> Option<DxbcChunk<'a>> {
        self.chunk(FourCC::SHEX).or_else(|| self.chunk(FourCC::SHDR))
    }
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, DxbcError> {
    let end = offset
        .checked_add(4)
        .ok_or_else(|| DxbcError::MalformedHeader("u32 read offset overflows".into()))?;
    let slice = bytes.get(offset..end).ok_or_else(|| {
        DxbcError::MalformedHeader(format!(
            "need 4 bytes at {offset}..{end}, but buffer length is {}",
            bytes.len()
        ))
    })?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}
