#![allow(dead_code)]

use mp4rotate::engine::{EncodeEngine, EngineOutput, FilterSpec};
use mp4rotate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const IDENTITY: [i32; 9] = [0x00010000, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000];

/// Offsets inside [`minimal_file`]: ftyp(24) | moov hdr(8) | trak hdr(8) | tkhd hdr(8).
pub const TKHD_START: usize = 40;
pub const TKHD_CONTENT: usize = TKHD_START + 8;
pub const MATRIX_V0: usize = TKHD_CONTENT + 40;
pub const MATRIX_V1: usize = TKHD_CONTENT + 52;

pub fn boxed(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

pub fn container(typ: &[u8; 4], kids: &[Vec<u8>]) -> Vec<u8> {
    boxed(typ, &kids.concat())
}

pub fn ftyp() -> Vec<u8> {
    let mut p = Vec::new();
    // major brand "isom"
    p.extend_from_slice(b"isom");
    // minor version
    p.extend_from_slice(&512u32.to_be_bytes());
    // compatible brands
    p.extend_from_slice(b"isom");
    p.extend_from_slice(b"mp41");
    boxed(b"ftyp", &p)
}

/// Track header with recognizable, non-zero filler in every field around
/// the matrix, so stray writes show up in byte comparisons.
pub fn tkhd(version: u8, track_id: u32, matrix: [i32; 9], width: u32, height: u32) -> Vec<u8> {
    let mut p = vec![version, 0, 0, 3];
    if version == 1 {
        p.extend_from_slice(&0x0101_0101_0101_0101u64.to_be_bytes()); // creation_time
        p.extend_from_slice(&0x0202_0202_0202_0202u64.to_be_bytes()); // modification_time
        p.extend_from_slice(&track_id.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&0x0303_0303_0303_0303u64.to_be_bytes()); // duration
    } else {
        p.extend_from_slice(&0x0101_0101u32.to_be_bytes());
        p.extend_from_slice(&0x0202_0202u32.to_be_bytes());
        p.extend_from_slice(&track_id.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&0x0303_0303u32.to_be_bytes());
    }
    p.extend_from_slice(&[0u8; 8]);
    // layer, alternate_group, volume, reserved
    p.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00]);
    for v in matrix {
        p.extend_from_slice(&v.to_be_bytes());
    }
    p.extend_from_slice(&(width << 16).to_be_bytes());
    p.extend_from_slice(&(height << 16).to_be_bytes());
    boxed(b"tkhd", &p)
}

pub fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut p = vec![0u8; 8]; // version+flags, pre_defined
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]);
    p.extend_from_slice(b"Handler\0");
    boxed(b"hdlr", &p)
}

pub fn mdhd() -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(&[0u8; 8]);
    p.extend_from_slice(&1000u32.to_be_bytes());
    p.extend_from_slice(&5000u32.to_be_bytes());
    p.extend_from_slice(&[0x55, 0xc4, 0, 0]);
    boxed(b"mdhd", &p)
}

/// `trak { tkhd, mdia { mdhd, hdlr } }`
pub fn trak_with_handler(tkhd: Vec<u8>, handler: &[u8; 4]) -> Vec<u8> {
    container(b"trak", &[tkhd, container(b"mdia", &[mdhd(), hdlr(handler)])])
}

pub fn mdat(len: usize) -> Vec<u8> {
    let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    boxed(b"mdat", &payload)
}

/// `ftyp + moov { trak { tkhd } }`
pub fn minimal_file(version: u8) -> Vec<u8> {
    let trak = container(b"trak", &[tkhd(version, 1, IDENTITY, 1920, 1080)]);
    [ftyp(), container(b"moov", &[trak])].concat()
}

pub fn matrix_at(buf: &[u8], offset: usize) -> [i32; 9] {
    let mut m = [0i32; 9];
    for (i, slot) in m.iter_mut().enumerate() {
        let at = offset + i * 4;
        *slot = i32::from_be_bytes(buf[at..at + 4].try_into().unwrap());
    }
    m
}

pub fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

/// Engine double that records calls and writes a marker file.
pub struct FakeEngine {
    pub available: bool,
    pub fail: bool,
    pub calls: Mutex<Vec<(PathBuf, FilterSpec, PathBuf)>>,
}

impl FakeEngine {
    pub fn new(available: bool) -> Self {
        Self { available, fail: false, calls: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { available: true, fail: true, calls: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub const REENCODED: &[u8] = b"reencoded pixels";

impl EncodeEngine for FakeEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    fn reencode(&self, input: &Path, filter: &FilterSpec, output: &Path) -> Result<EngineOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), filter.clone(), output.to_path_buf()));
        // partial output, as a real encoder leaves behind when it dies
        std::fs::write(output, b"partial")?;
        if self.fail {
            return Err(Error::ExternalEngineFailure("encoder crashed".into()));
        }
        std::fs::write(output, REENCODED)?;
        Ok(EngineOutput::default())
    }
}
