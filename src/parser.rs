use crate::boxes::{BoxHeader, BoxRef, FourCC, NodeKind};
use crate::error::{Error, Result};
use crate::known_boxes::KnownBox;
use byteorder::{BigEndian, ByteOrder};

/// Read the header of the box starting at `offset`, bounded by the parent's
/// end offset `end`.
///
/// A declared size of 0 is resolved to "runs to `end`", so the returned
/// header always carries a concrete size.
pub fn read_box_header(buf: &[u8], offset: u64, end: u64) -> Result<BoxHeader> {
    let end = end.min(buf.len() as u64);
    let available = end.saturating_sub(offset);
    let need = |needed: u64| {
        if available < needed {
            Err(Error::IncompleteContainer { offset, needed, available })
        } else {
            Ok(())
        }
    };

    need(8)?;
    let at = offset as usize;
    let size32 = BigEndian::read_u32(&buf[at..at + 4]);
    let typ = FourCC([buf[at + 4], buf[at + 5], buf[at + 6], buf[at + 7]]);

    let mut size = size32 as u64;
    let mut header_size = 8u64;
    if size32 == 1 {
        need(16)?;
        size = BigEndian::read_u64(&buf[at + 8..at + 16]);
        header_size = 16;
    }

    let mut uuid = None;
    if typ == FourCC::UUID {
        need(header_size + 16)?;
        let from = at + header_size as usize;
        let mut u = [0u8; 16];
        u.copy_from_slice(&buf[from..from + 16]);
        uuid = Some(u);
        header_size += 16;
    }

    if size == 0 {
        size = available;
    }
    if size < header_size {
        return Err(Error::CorruptContainer {
            typ,
            offset,
            reason: "declared size is smaller than its header",
        });
    }
    if size > available {
        return Err(Error::CorruptContainer {
            typ,
            offset,
            reason: "declared size exceeds the parent range",
        });
    }

    Ok(BoxHeader { size, typ, uuid, header_size, start: offset })
}

/// Sibling boxes of one `[start, end)` range, in file order.
///
/// Each sibling's start is only known once its predecessor's size has been
/// read, so this is strictly sequential. Iteration stops after the first
/// error.
pub struct BoxIter<'a> {
    buf: &'a [u8],
    pos: u64,
    end: u64,
    failed: bool,
}

impl<'a> Iterator for BoxIter<'a> {
    type Item = Result<BoxHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.end {
            return None;
        }
        match read_box_header(self.buf, self.pos, self.end) {
            Ok(h) => {
                tracing::trace!(typ = %h.typ, start = h.start, size = h.size, "box");
                self.pos = h.end();
                Some(Ok(h))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

pub fn boxes_in(buf: &[u8], start: u64, end: u64) -> BoxIter<'_> {
    BoxIter { buf, pos: start, end: end.min(buf.len() as u64), failed: false }
}

/// Top-level boxes of a whole file buffer.
pub fn top_level(buf: &[u8]) -> BoxIter<'_> {
    boxes_in(buf, 0, buf.len() as u64)
}

/// Children of a container box.
pub fn children<'a>(buf: &'a [u8], parent: &BoxHeader) -> BoxIter<'a> {
    boxes_in(buf, parent.content_start(), parent.end())
}

/// First box of type `typ` among the siblings in `[start, end)`.
pub fn find_child(buf: &[u8], start: u64, end: u64, typ: FourCC) -> Result<Option<BoxHeader>> {
    for h in boxes_in(buf, start, end) {
        let h = h?;
        if h.typ == typ {
            return Ok(Some(h));
        }
    }
    Ok(None)
}

/// First child of `parent` with type `typ`.
pub fn find_in(buf: &[u8], parent: &BoxHeader, typ: FourCC) -> Result<Option<BoxHeader>> {
    find_child(buf, parent.content_start(), parent.end(), typ)
}

/// Parse the whole buffer into a tree, descending into known containers.
pub fn parse_tree(buf: &[u8]) -> Result<Vec<BoxRef>> {
    parse_children(buf, 0, buf.len() as u64)
}

pub fn parse_children(buf: &[u8], start: u64, end: u64) -> Result<Vec<BoxRef>> {
    let mut kids = Vec::new();
    for h in boxes_in(buf, start, end) {
        let h = h?;
        let known = KnownBox::from(h.typ);
        let kind = if known.is_container() {
            NodeKind::Container(parse_children(buf, h.content_start(), h.end())?)
        } else if known.is_full_box() {
            let (version, flags) = read_version_flags(buf, &h)?;
            NodeKind::FullBox { version, flags }
        } else {
            NodeKind::Leaf
        };
        kids.push(BoxRef { hdr: h, kind });
    }
    Ok(kids)
}

/// Version byte and 24-bit flags at the start of a FullBox's content.
pub fn read_version_flags(buf: &[u8], h: &BoxHeader) -> Result<(u8, u32)> {
    if h.content_len() < 4 {
        return Err(Error::CorruptContainer {
            typ: h.typ,
            offset: h.start,
            reason: "full box is too short for version and flags",
        });
    }
    let at = h.content_start() as usize;
    let version = buf[at];
    let flags = BigEndian::read_u24(&buf[at + 1..at + 4]);
    Ok((version, flags))
}
