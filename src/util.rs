/// Classic 16-bytes-per-line hex dump, with offsets starting at `start_offset`.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{b:02x} ")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_pads_short_lines_and_masks_control_bytes() {
        let out = hex_dump(&[0x6d, 0x64, 0x61, 0x74, 0x00, 0xff], 0x20);
        assert_eq!(
            out,
            format!("00000020  {:<48}  |mdat..|\n", "6d 64 61 74 00 ff ")
        );
    }

    #[test]
    fn dump_splits_every_16_bytes() {
        let out = hex_dump(&[b'a'; 20], 0);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("00000010  61 61 61 61 "));
        assert!(lines[1].ends_with("|aaaa|"));
    }
}
