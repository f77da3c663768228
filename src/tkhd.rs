//! Track header (`tkhd`) lookup and matrix patching.
//!
//! Content layout after the box header, version 0 / version 1:
//!
//! ```text
//! version+flags        0          0
//! creation_time        4  (u32)   4  (u64)
//! modification_time    8  (u32)  12  (u64)
//! track_ID            12         20
//! reserved            16         24
//! duration            20  (u32)  28  (u64)
//! reserved[2]         24         36
//! layer, alt_group,
//! volume, reserved    32         44
//! matrix[9]           40         52
//! width (16.16)       76         88
//! height (16.16)      80         92
//! ```

use crate::boxes::{BoxHeader, FourCC};
use crate::error::{Error, Result};
use crate::parser::{children, find_in, read_version_flags, top_level};
use crate::rotation::{MATRIX_LEN, Matrix, RotationAngle, from_fixed_16_16};
use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;
use tracing::debug;

pub const MATRIX_OFFSET_V0: u64 = 40;
pub const MATRIX_OFFSET_V1: u64 = 52;

/// Offset of the matrix relative to the start of the `tkhd` content.
pub fn matrix_offset(version: u8) -> Option<u64> {
    match version {
        0 => Some(MATRIX_OFFSET_V0),
        1 => Some(MATRIX_OFFSET_V1),
        _ => None,
    }
}

/// Decoded view of one `tkhd` box.
#[derive(Debug, Clone, Serialize)]
pub struct TrackHeader {
    /// Absolute offset of the `tkhd` box
    pub offset: u64,
    pub version: u8,
    pub flags: u32,
    pub track_id: u32,
    /// Absolute offset of the first matrix byte
    pub matrix_offset: u64,
    pub matrix: Matrix,
    pub width: f64,
    pub height: f64,
}

impl TrackHeader {
    pub fn parse(buf: &[u8], hdr: &BoxHeader) -> Result<Self> {
        let (version, flags) = read_version_flags(buf, hdr)?;
        let rel = matrix_offset(version).ok_or(Error::CorruptContainer {
            typ: hdr.typ,
            offset: hdr.start,
            reason: "unknown tkhd version",
        })?;
        if hdr.content_len() < rel + MATRIX_LEN as u64 + 8 {
            return Err(Error::CorruptContainer {
                typ: hdr.typ,
                offset: hdr.start,
                reason: "tkhd content is shorter than its version layout",
            });
        }

        let content = hdr.content_start() as usize;
        let track_id_at = content + if version == 0 { 12 } else { 20 };
        let matrix_at = content + rel as usize;
        let dims_at = matrix_at + MATRIX_LEN;

        Ok(TrackHeader {
            offset: hdr.start,
            version,
            flags,
            track_id: BigEndian::read_u32(&buf[track_id_at..track_id_at + 4]),
            matrix_offset: matrix_at as u64,
            matrix: Matrix::from_be_bytes(&buf[matrix_at..matrix_at + MATRIX_LEN]),
            width: from_fixed_16_16(BigEndian::read_i32(&buf[dims_at..dims_at + 4])),
            height: from_fixed_16_16(BigEndian::read_i32(&buf[dims_at + 4..dims_at + 8])),
        })
    }

    /// Canonical rotation currently encoded in the matrix, if any.
    pub fn rotation(&self) -> Option<RotationAngle> {
        RotationAngle::from_matrix(&self.matrix)
    }
}

/// A `trak` that carries a track header.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    /// Position among the `trak` children of `moov`
    pub index: usize,
    /// `hdlr` handler type, e.g. `vide` or `soun`
    pub handler: Option<String>,
    pub header: TrackHeader,
}

/// The first top-level `moov`, after checking the file opens with `ftyp`.
pub fn locate_moov(buf: &[u8]) -> Result<BoxHeader> {
    let mut top = top_level(buf);
    match top.next() {
        Some(Ok(h)) if h.typ == FourCC::FTYP => {}
        Some(Err(e)) => return Err(e),
        _ => return Err(Error::MissingFtyp),
    }
    for h in top {
        let h = h?;
        if h.typ == FourCC::MOOV {
            return Ok(h);
        }
    }
    Err(Error::NoTrackHeaderFound)
}

fn handler_type(buf: &[u8], trak: &BoxHeader) -> Result<Option<FourCC>> {
    let Some(mdia) = find_in(buf, trak, FourCC::MDIA)? else {
        return Ok(None);
    };
    let Some(hdlr) = find_in(buf, &mdia, FourCC::HDLR)? else {
        return Ok(None);
    };
    // version+flags, pre_defined, handler_type
    if hdlr.content_len() < 12 {
        return Err(Error::CorruptContainer {
            typ: hdlr.typ,
            offset: hdlr.start,
            reason: "hdlr is too short for a handler type",
        });
    }
    let at = hdlr.content_start() as usize + 8;
    Ok(Some(FourCC([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])))
}

/// Every `trak` under `moov` that has a `tkhd`, in file order.
pub fn track_headers(buf: &[u8]) -> Result<Vec<Track>> {
    let moov = locate_moov(buf)?;
    let mut tracks = Vec::new();
    let mut index = 0;
    for trak in children(buf, &moov) {
        let trak = trak?;
        if trak.typ != FourCC::TRAK {
            continue;
        }
        match find_in(buf, &trak, FourCC::TKHD)? {
            Some(tkhd) => tracks.push(Track {
                index,
                handler: handler_type(buf, &trak)?.map(|cc| cc.to_string()),
                header: TrackHeader::parse(buf, &tkhd)?,
            }),
            None => debug!(index, offset = trak.start, "trak without tkhd"),
        }
        index += 1;
    }
    Ok(tracks)
}

/// The track whose header gets rotated: the first video track, or the first
/// track with a header when no track declares a video handler.
///
/// Unlike [`track_headers`] this only parses the `tkhd` it returns, and a
/// `hdlr` it cannot read counts as no handler, so a damaged secondary track
/// does not block the video track.
pub fn select_track(buf: &[u8]) -> Result<Track> {
    let moov = locate_moov(buf)?;
    let mut fallback = None;
    let mut index = 0;
    for trak in children(buf, &moov) {
        let trak = trak?;
        if trak.typ != FourCC::TRAK {
            continue;
        }
        let current = index;
        index += 1;
        let Some(tkhd) = find_in(buf, &trak, FourCC::TKHD)? else {
            debug!(index = current, offset = trak.start, "trak without tkhd");
            continue;
        };
        let handler = handler_type(buf, &trak).unwrap_or_else(|e| {
            debug!(index = current, error = %e, "unreadable hdlr, treating track as handler-less");
            None
        });
        if handler == Some(FourCC::VIDE) {
            return Ok(Track {
                index: current,
                handler: handler.map(|cc| cc.to_string()),
                header: TrackHeader::parse(buf, &tkhd)?,
            });
        }
        if fallback.is_none() {
            fallback = Some((current, handler, tkhd));
        }
    }
    let (index, handler, tkhd) = fallback.ok_or(Error::NoTrackHeaderFound)?;
    Ok(Track {
        index,
        handler: handler.map(|cc| cc.to_string()),
        header: TrackHeader::parse(buf, &tkhd)?,
    })
}

/// Matrix of the track [`select_track`] would patch.
pub fn read_matrix(buf: &[u8]) -> Result<Matrix> {
    Ok(select_track(buf)?.header.matrix)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatchOptions {
    /// Keep the `tkhd` width/height in display orientation for 90°/270°
    pub swap_dimensions: bool,
}

/// What a patch changed.
#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub track_index: usize,
    pub track_id: u32,
    pub version: u8,
    pub matrix_offset: u64,
    pub previous: Matrix,
    pub matrix: Matrix,
    pub dimensions_swapped: bool,
}

/// Overwrite the selected track's matrix with the canonical one for `angle`.
///
/// The buffer must hold the whole file. Only the 36 matrix bytes are
/// written, plus the 8 width/height bytes when `swap_dimensions` is set and
/// the orientation changes. Patching again replaces the matrix, it does not
/// compose with the previous rotation.
pub fn patch_rotation(
    buf: &mut [u8],
    angle: RotationAngle,
    opts: PatchOptions,
) -> Result<PatchReport> {
    let track = select_track(buf)?;
    let header = &track.header;
    let matrix = angle.matrix();

    let at = header.matrix_offset as usize;
    buf[at..at + MATRIX_LEN].copy_from_slice(&matrix.to_be_bytes());

    let was_swapped = header.rotation().is_some_and(RotationAngle::swaps_dimensions);
    let dimensions_swapped = opts.swap_dimensions && was_swapped != angle.swaps_dimensions();
    if dimensions_swapped {
        let dims = at + MATRIX_LEN;
        let (w, h) = buf[dims..dims + 8].split_at_mut(4);
        w.swap_with_slice(h);
    }

    debug!(
        track_id = header.track_id,
        version = header.version,
        matrix_offset = header.matrix_offset,
        %angle,
        dimensions_swapped,
        "patched tkhd matrix"
    );

    Ok(PatchReport {
        track_index: track.index,
        track_id: header.track_id,
        version: header.version,
        matrix_offset: header.matrix_offset,
        previous: header.matrix,
        matrix,
        dimensions_swapped,
    })
}
