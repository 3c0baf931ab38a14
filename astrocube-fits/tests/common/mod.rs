#![allow(dead_code)]

use std::io::{Cursor, Write};

use astrocube_fits::HeaderStore;
use tempfile::NamedTempFile;

pub const BLOCK: usize = 2880;

/// Primary header for a cube of the given element type and extents.
pub fn cube_header(bitpix: i64, extents: &[usize]) -> HeaderStore {
    let mut header = HeaderStore::new();
    header.insert("SIMPLE", "T");
    header.insert("BITPIX", bitpix.to_string());
    header.insert("NAXIS", extents.len().to_string());
    for (i, n) in extents.iter().enumerate() {
        header.insert(format!("NAXIS{}", i + 1), n.to_string());
    }
    header
}

/// Header records followed by the data segment padded to a whole block.
pub fn fits_bytes(header: &HeaderStore, data: &[u8]) -> Vec<u8> {
    let mut bytes = header.to_records();
    bytes.extend_from_slice(data);
    let padded = bytes.len().div_ceil(BLOCK) * BLOCK;
    bytes.resize(padded, 0);
    bytes
}

pub fn f32_segment(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn i16_segment(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn cursor(header: &HeaderStore, data: &[u8]) -> Cursor<Vec<u8>> {
    Cursor::new(fits_bytes(header, data))
}

pub fn temp_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write cube");
    file.flush().expect("flush cube");
    file
}

/// (4, 4, 8) cube where plane `z` holds `values[z]` everywhere.
pub fn plane_constant_values(values: [f32; 8]) -> Vec<f32> {
    values
        .iter()
        .flat_map(|&v| std::iter::repeat(v).take(16))
        .collect()
}
