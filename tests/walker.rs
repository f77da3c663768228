mod common;

use common::*;
use mp4rotate::parser::{
    boxes_in, children, find_child, find_in, parse_tree, read_box_header, top_level,
};
use mp4rotate::{Error, FourCC, NodeKind};

#[test]
fn read_single_ftyp_header() {
    let data = ftyp();
    let hdr = read_box_header(&data, 0, data.len() as u64).expect("read_box_header failed");

    assert_eq!(hdr.start, 0);
    assert_eq!(hdr.size, 24);
    assert_eq!(hdr.typ, FourCC(*b"ftyp"));
    assert_eq!(hdr.header_size, 8);
    assert_eq!(hdr.content_start(), 8);
    assert_eq!(hdr.end(), 24);
}

#[test]
fn siblings_come_in_file_order() {
    let data = [ftyp(), boxed(b"free", &[0; 3]), mdat(10)].concat();
    let types: Vec<FourCC> = top_level(&data).map(|h| h.unwrap().typ).collect();
    assert_eq!(types, vec![FourCC(*b"ftyp"), FourCC(*b"free"), FourCC(*b"mdat")]);
}

#[test]
fn descends_into_container_content() {
    let data = minimal_file(0);
    let moov = top_level(&data).nth(1).unwrap().unwrap();
    assert_eq!(moov.typ, FourCC::MOOV);

    let kids: Vec<_> = children(&data, &moov).collect::<Result<_, _>>().unwrap();
    assert_eq!(kids.len(), 1);
    assert_eq!(kids[0].typ, FourCC::TRAK);
    assert_eq!(kids[0].start, 32);

    let tkhd = find_in(&data, &kids[0], FourCC::TKHD).unwrap().unwrap();
    assert_eq!(tkhd.start as usize, TKHD_START);
    assert_eq!(tkhd.size, 92);
}

#[test]
fn oversized_child_is_corrupt() {
    // trak claims 4 bytes more than moov has left
    let mut data = minimal_file(0);
    let trak_size = u32_at(&data, 32);
    data[32..36].copy_from_slice(&(trak_size + 4).to_be_bytes());

    let moov = top_level(&data).nth(1).unwrap().unwrap();
    let err = children(&data, &moov).next().unwrap().unwrap_err();
    match err {
        Error::CorruptContainer { typ, offset, .. } => {
            assert_eq!(typ, FourCC::TRAK);
            assert_eq!(offset, 32);
        }
        other => panic!("expected CorruptContainer, got {other:?}"),
    }
}

#[test]
fn top_level_box_past_eof_is_corrupt() {
    let mut data = ftyp();
    data.extend_from_slice(&1000u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&[0; 16]);

    let items: Vec<_> = top_level(&data).collect();
    assert_eq!(items.len(), 2);
    assert!(matches!(items[1], Err(Error::CorruptContainer { .. })));
}

#[test]
fn short_tail_is_incomplete() {
    let mut data = ftyp();
    data.extend_from_slice(&[0, 0, 0, 8, b'f']);
    let err = top_level(&data).nth(1).unwrap().unwrap_err();
    assert!(matches!(
        err,
        Error::IncompleteContainer { offset: 24, needed: 8, available: 5 }
    ));
}

#[test]
fn truncated_largesize_is_incomplete() {
    let mut data = Vec::new();
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&[0; 4]);
    let err = read_box_header(&data, 0, data.len() as u64).unwrap_err();
    assert!(matches!(err, Error::IncompleteContainer { needed: 16, .. }));
}

#[test]
fn largesize_box_is_walked() {
    let mut data = ftyp();
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&(16u64 + 32).to_be_bytes());
    data.extend_from_slice(&[0xAB; 32]);
    data.extend_from_slice(&boxed(b"free", &[]));

    let hdrs: Vec<_> = top_level(&data).collect::<Result<_, _>>().unwrap();
    assert_eq!(hdrs.len(), 3);
    assert_eq!(hdrs[1].header_size, 16);
    assert_eq!(hdrs[1].content_len(), 32);
    assert_eq!(hdrs[2].typ, FourCC(*b"free"));
    assert_eq!(hdrs[2].start, 24 + 48);
}

#[test]
fn uuid_box_carries_user_type() {
    let mut payload = vec![0x42; 16];
    payload.extend_from_slice(&[1, 2, 3]);
    let data = boxed(b"uuid", &payload);

    let hdr = read_box_header(&data, 0, data.len() as u64).unwrap();
    assert_eq!(hdr.uuid, Some([0x42; 16]));
    assert_eq!(hdr.header_size, 24);
    assert_eq!(hdr.content_len(), 3);
}

#[test]
fn size_zero_extends_to_parent_end_not_file_end() {
    let inner = {
        let mut v = Vec::new();
        v.extend_from_slice(&0u32.to_be_bytes());
        v.extend_from_slice(b"free");
        v.extend_from_slice(&[0; 4]);
        v
    };
    let data = [boxed(b"udta", &inner), boxed(b"skip", &[])].concat();
    let udta = top_level(&data).next().unwrap().unwrap();
    let free = children(&data, &udta).next().unwrap().unwrap();
    assert_eq!(free.end(), udta.end());
    assert_eq!(free.size, 12);
}

#[test]
fn find_child_returns_first_match() {
    let data = [boxed(b"free", &[1]), boxed(b"skip", &[]), boxed(b"free", &[2, 2])].concat();
    let hit = find_child(&data, 0, data.len() as u64, FourCC(*b"free")).unwrap().unwrap();
    assert_eq!(hit.start, 0);
    assert_eq!(hit.size, 9);
    assert!(find_child(&data, 0, data.len() as u64, FourCC(*b"moov")).unwrap().is_none());
}

#[test]
fn bounded_range_ignores_bytes_outside() {
    let data = [boxed(b"free", &[]), boxed(b"skip", &[]), boxed(b"wide", &[])].concat();
    let types: Vec<FourCC> = boxes_in(&data, 8, 16).map(|h| h.unwrap().typ).collect();
    assert_eq!(types, vec![FourCC(*b"skip")]);
}

#[test]
fn tree_marks_full_boxes_and_containers() {
    let data = [
        ftyp(),
        container(b"moov", &[trak_with_handler(tkhd(1, 7, IDENTITY, 640, 480), b"vide")]),
    ]
    .concat();
    let tree = parse_tree(&data).unwrap();
    assert_eq!(tree.len(), 2);
    assert!(matches!(tree[0].kind, NodeKind::Leaf));

    let NodeKind::Container(moov_kids) = &tree[1].kind else { panic!("moov is a container") };
    let NodeKind::Container(trak_kids) = &moov_kids[0].kind else { panic!("trak is a container") };
    assert!(matches!(trak_kids[0].kind, NodeKind::FullBox { version: 1, flags: 3 }));
    assert!(matches!(trak_kids[1].kind, NodeKind::Container(_)));
}
