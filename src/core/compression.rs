//! Compression envelope of object payloads.
//!
//! A compressed payload is a run of chunks, each with a 9-byte header:
//! two magic bytes naming the algorithm, a method byte, then the compressed and the
//! uncompressed chunk sizes as 3-byte little-endian integers.
use std::io::Read;

use flate2::read::DeflateDecoder;
use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::map,
    number::complete::{be_u8, le_u24},
    IResult,
};
use tracing::debug;

use crate::core::error::{Result, RootError};

/// Size of one chunk header in bytes
pub const ENVELOPE_HEADER_SIZE: usize = 9;

/// zlib stream header between the envelope header and the raw deflate data
const ZLIB_HEADER_SIZE: usize = 2;

/// xxhash checksum preceding an LZ4 block
const LZ4_CHECKSUM_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Zlib,
    Lzma,
    Lz4,
    /// Old ROOT-internal deflate variant, recognised but not supported
    Legacy,
}

#[derive(Debug, PartialEq)]
struct ChunkHeader {
    algorithm: Algorithm,
    method: u8,
    compressed_len: usize,
    uncompressed_len: usize,
}

fn chunk_header(i: &[u8]) -> IResult<&[u8], ChunkHeader> {
    let (i, algorithm) = alt((
        map(tag("ZL"), |_| Algorithm::Zlib),
        map(tag("XZ"), |_| Algorithm::Lzma),
        map(tag("L4"), |_| Algorithm::Lz4),
        map(tag("CS"), |_| Algorithm::Legacy),
    ))(i)?;
    let (i, method) = be_u8(i)?;
    let (i, compressed_len) = le_u24(i)?;
    let (i, uncompressed_len) = le_u24(i)?;
    Ok((
        i,
        ChunkHeader {
            algorithm,
            method,
            compressed_len: compressed_len as usize,
            uncompressed_len: uncompressed_len as usize,
        },
    ))
}

fn parse_header(input: &[u8]) -> Result<ChunkHeader> {
    if input.len() < ENVELOPE_HEADER_SIZE {
        return Err(RootError::format(format!(
            "compressed buffer of {} bytes is shorter than its header",
            input.len()
        )));
    }
    let (_, hdr) = chunk_header(input).map_err(|_| {
        RootError::format(format!(
            "unknown compression header {:02x?}",
            &input[..ENVELOPE_HEADER_SIZE]
        ))
    })?;
    let expected_method = match hdr.algorithm {
        Algorithm::Zlib => 8,
        Algorithm::Lzma => 0,
        Algorithm::Lz4 => 1,
        Algorithm::Legacy => {
            return Err(RootError::format("old ROOT compression format is not supported"))
        }
    };
    if hdr.method != expected_method {
        return Err(RootError::format(format!(
            "unsupported method {} for {:?} compression",
            hdr.method, hdr.algorithm
        )));
    }
    Ok(hdr)
}

fn inflate_chunk(hdr: &ChunkHeader, chunk: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(hdr.uncompressed_len);
    match hdr.algorithm {
        Algorithm::Zlib => {
            let start = ENVELOPE_HEADER_SIZE + ZLIB_HEADER_SIZE;
            let payload = chunk
                .get(start..)
                .ok_or_else(|| RootError::format("zlib chunk without payload"))?;
            DeflateDecoder::new(payload)
                .read_to_end(&mut out)
                .map_err(|e| RootError::Decompress(e.to_string()))?;
        }
        Algorithm::Lzma => {
            let mut payload = &chunk[ENVELOPE_HEADER_SIZE..];
            lzma_rs::xz_decompress(&mut payload, &mut out)
                .map_err(|e| RootError::Decompress(format!("{:?}", e)))?;
        }
        Algorithm::Lz4 => {
            let start = ENVELOPE_HEADER_SIZE + LZ4_CHECKSUM_SIZE;
            let payload = chunk
                .get(start..)
                .ok_or_else(|| RootError::format("lz4 chunk without payload"))?;
            out = lz4_compress::decompress(payload)
                .map_err(|e| RootError::Decompress(format!("{:?}", e)))?;
        }
        Algorithm::Legacy => {
            return Err(RootError::format("old ROOT compression format is not supported"))
        }
    }
    Ok(out)
}

/// Inflate `input` into exactly `expected` bytes.
///
/// Chunks are decoded in order until the declared size is reached or the input runs
/// out; any other total is a [`RootError::SizeMismatch`].
pub fn decompress(input: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    let mut rest = input;
    loop {
        let hdr = parse_header(rest)?;
        let chunk_len = ENVELOPE_HEADER_SIZE + hdr.compressed_len;
        if chunk_len > rest.len() {
            return Err(RootError::Truncated {
                offset: input.len() - rest.len(),
                need: chunk_len,
                len: input.len(),
            });
        }
        let produced = inflate_chunk(&hdr, &rest[..chunk_len])?;
        debug!(
            algorithm = ?hdr.algorithm,
            compressed = chunk_len,
            produced = produced.len(),
            "inflated chunk"
        );
        out.extend_from_slice(&produced);
        rest = &rest[chunk_len..];
        if out.len() >= expected || rest.is_empty() {
            break;
        }
    }
    if out.len() != expected {
        return Err(RootError::SizeMismatch {
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}
