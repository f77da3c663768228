use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const FTYP: FourCC = FourCC(*b"ftyp");
    pub const MOOV: FourCC = FourCC(*b"moov");
    pub const TRAK: FourCC = FourCC(*b"trak");
    pub const TKHD: FourCC = FourCC(*b"tkhd");
    pub const MDIA: FourCC = FourCC(*b"mdia");
    pub const HDLR: FourCC = FourCC(*b"hdlr");
    pub const UUID: FourCC = FourCC(*b"uuid");
    /// `hdlr` handler type of video tracks
    pub const VIDE: FourCC = FourCC(*b"vide");

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

/// Location of one box inside a byte buffer.
///
/// Offsets are absolute within the buffer that was walked. A header never
/// owns any bytes; it is only valid for the buffer it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub size: u64,          // total size including header, already resolved for size=0
    pub typ: FourCC,
    pub uuid: Option<[u8; 16]>,
    pub header_size: u64,   // 8, 16, 24 or 32
    pub start: u64,         // buffer offset of header start
}

impl BoxHeader {
    pub fn content_start(&self) -> u64 {
        self.start + self.header_size
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn content_len(&self) -> u64 {
        self.size - self.header_size
    }
}

/// Node of an inspected box tree, see [`crate::parser::parse_tree`].
#[derive(Debug)]
pub enum NodeKind {
    Container(Vec<BoxRef>),
    FullBox { version: u8, flags: u32 },
    Leaf,
}

#[derive(Debug)]
pub struct BoxRef {
    pub hdr: BoxHeader,
    pub kind: NodeKind,
}
