/// Hexdump with offsets and an ASCII column, 16 bytes per line.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk.iter().map(|b| {
            let c = *b;
            if (32..=126).contains(&c) { c as char } else { '.' }
        }).collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

/// Offsets at which two equally long buffers differ.
pub fn diff_offsets(a: &[u8], b: &[u8]) -> Vec<usize> {
    a.iter()
        .zip(b)
        .enumerate()
        .filter_map(|(i, (x, y))| (x != y).then_some(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_line_layout() {
        let dump = hex_dump(&[0x00, 0x01, b'A'], 0x30);
        assert!(dump.starts_with("00000030  00 01 41 "));
        assert!(dump.trim_end().ends_with("|..A|"));
    }

    #[test]
    fn diff_finds_changed_bytes() {
        assert_eq!(diff_offsets(&[1, 2, 3, 4], &[1, 9, 3, 8]), vec![1, 3]);
    }
}
