//! IDX file parsing
//!
//! MNIST ships in the IDX format: a big-endian u32 magic number, one u32 per
//! dimension, then the raw u8 payload.

use std::path::Path;

use thiserror::Error;

/// Magic number of a 3-dimensional u8 IDX file (images)
pub const IMAGES_MAGIC: u32 = 0x0000_0803;
/// Magic number of a 1-dimensional u8 IDX file (labels)
pub const LABELS_MAGIC: u32 = 0x0000_0801;

/// IDX parsing errors
#[derive(Error, Debug)]
pub enum IdxError {
    #[error("Bad magic number: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("Truncated IDX data: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("IDX dimensions overflow: {0:?}")]
    Overflow(Vec<u32>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw images decoded from an IDX file
#[derive(Debug, Clone)]
pub struct IdxImages {
    /// Number of images
    pub count: usize,
    /// Rows per image
    pub rows: usize,
    /// Columns per image
    pub cols: usize,
    /// Row-major pixels, `count * rows * cols` bytes
    pub pixels: Vec<u8>,
}

impl IdxImages {
    /// Pixels per image
    pub fn image_size(&self) -> usize {
        self.rows * self.cols
    }
}

fn read_be_u32(data: &[u8], offset: &mut usize) -> Result<u32, IdxError> {
    let end = *offset + 4;
    let bytes = data.get(*offset..end).ok_or(IdxError::Truncated {
        needed: end,
        available: data.len(),
    })?;
    *offset = end;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn check_magic(data: &[u8], offset: &mut usize, expected: u32) -> Result<(), IdxError> {
    let found = read_be_u32(data, offset)?;
    if found != expected {
        return Err(IdxError::BadMagic { expected, found });
    }
    Ok(())
}

fn payload(data: &[u8], offset: usize, len: usize) -> Result<&[u8], IdxError> {
    let needed = offset.checked_add(len).ok_or(IdxError::Truncated {
        needed: usize::MAX,
        available: data.len(),
    })?;
    data.get(offset..needed).ok_or(IdxError::Truncated {
        needed,
        available: data.len(),
    })
}

/// Parse an in-memory IDX image file
pub fn parse_images(data: &[u8]) -> Result<IdxImages, IdxError> {
    let mut offset = 0usize;
    check_magic(data, &mut offset, IMAGES_MAGIC)?;

    let count = read_be_u32(data, &mut offset)?;
    let rows = read_be_u32(data, &mut offset)?;
    let cols = read_be_u32(data, &mut offset)?;

    let len = (count as usize)
        .checked_mul(rows as usize)
        .and_then(|n| n.checked_mul(cols as usize))
        .ok_or_else(|| IdxError::Overflow(vec![count, rows, cols]))?;
    let pixels = payload(data, offset, len)?.to_vec();

    Ok(IdxImages {
        count: count as usize,
        rows: rows as usize,
        cols: cols as usize,
        pixels,
    })
}

/// Parse an in-memory IDX label file
pub fn parse_labels(data: &[u8]) -> Result<Vec<u8>, IdxError> {
    let mut offset = 0usize;
    check_magic(data, &mut offset, LABELS_MAGIC)?;

    let count = read_be_u32(data, &mut offset)? as usize;
    Ok(payload(data, offset, count)?.to_vec())
}

/// Read and parse an IDX image file from disk
pub fn read_images<P: AsRef<Path>>(path: P) -> Result<IdxImages, IdxError> {
    let data = std::fs::read(path)?;
    parse_images(&data)
}

/// Read and parse an IDX label file from disk
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, IdxError> {
    let data = std::fs::read(path)?;
    parse_labels(&data)
}

/// Encode images as an IDX byte buffer
pub fn encode_images(images: &IdxImages) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + images.pixels.len());
    out.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
    out.extend_from_slice(&(images.count as u32).to_be_bytes());
    out.extend_from_slice(&(images.rows as u32).to_be_bytes());
    out.extend_from_slice(&(images.cols as u32).to_be_bytes());
    out.extend_from_slice(&images.pixels);
    out
}

/// Encode labels as an IDX byte buffer
pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + labels.len());
    out.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}
