//! Custom converters for navmesh subrecords whose layouts are variable
//! length or flag gated and cannot be expressed as a flat schema.
//!
//! All converters are permissive: when a declared count runs past the end
//! of the buffer they stop converting and leave the remainder untouched,
//! matching the crate-wide truncation policy.

use crate::bytes::{read_be_u16, read_be_u32, swap2, swap4};

const NVTR_TRIANGLE_SIZE: usize = 16;
const NVDP_ENTRY_SIZE: usize = 8;

/// Island geometry is appended to an NVMI entry when this flag is set.
const NVMI_HAS_ISLAND: u32 = 0x0000_0001;

/// Navmesh triangles: eight 16-bit fields per entry. The Xbox build stores
/// the trailing pair as `cover_flags, flags`; PC wants `flags, cover_flags`.
pub fn convert_nvtr(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let count = out.len() / NVTR_TRIANGLE_SIZE;
    for i in 0..count {
        let base = i * NVTR_TRIANGLE_SIZE;
        for field in 0..8 {
            swap2(&mut out, base + field * 2);
        }
        let cover = [out[base + 12], out[base + 13]];
        out[base + 12] = out[base + 14];
        out[base + 13] = out[base + 15];
        out[base + 14] = cover[0];
        out[base + 15] = cover[1];
    }
    out
}

/// Navmesh door portals: `{door FormID, triangle u16, console payload u16}`
/// per entry. The trailing two bytes only mean something to the console
/// runtime and are zeroed for PC.
pub fn convert_nvdp(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let count = out.len() / NVDP_ENTRY_SIZE;
    for i in 0..count {
        let base = i * NVDP_ENTRY_SIZE;
        swap4(&mut out, base);
        swap2(&mut out, base + 4);
        out[base + 6] = 0;
        out[base + 7] = 0;
    }
    out
}

/// Navmesh info entry: fixed head, then island geometry when flagged, then
/// a count-prefixed list of linked doors.
pub fn convert_nvmi(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    if out.len() < 16 {
        return out;
    }
    let flags = read_be_u32(&out, 0);
    swap4(&mut out, 0); // flags
    swap4(&mut out, 4); // navmesh
    swap4(&mut out, 8); // location
    swap2(&mut out, 12); // grid x
    swap2(&mut out, 14); // grid y
    let mut offset = 16;

    if flags & NVMI_HAS_ISLAND != 0 {
        // Bounding box, six floats.
        for _ in 0..6 {
            if offset + 4 > out.len() {
                return out;
            }
            swap4(&mut out, offset);
            offset += 4;
        }
        // Triangles: u16 count, three u16 vertex indices each.
        if offset + 2 > out.len() {
            return out;
        }
        let triangle_count = read_be_u16(&out, offset) as usize;
        swap2(&mut out, offset);
        offset += 2;
        for _ in 0..triangle_count * 3 {
            if offset + 2 > out.len() {
                return out;
            }
            swap2(&mut out, offset);
            offset += 2;
        }
        // Vertices: u16 count, three floats each.
        if offset + 2 > out.len() {
            return out;
        }
        let vertex_count = read_be_u16(&out, offset) as usize;
        swap2(&mut out, offset);
        offset += 2;
        for _ in 0..vertex_count * 3 {
            if offset + 4 > out.len() {
                return out;
            }
            swap4(&mut out, offset);
            offset += 4;
        }
    }

    // Linked doors: u32 count, then {door FormID, triangle u16, unused u16}.
    if offset + 4 > out.len() {
        return out;
    }
    let door_count = read_be_u32(&out, offset) as usize;
    swap4(&mut out, offset);
    offset += 4;
    for _ in 0..door_count {
        if offset + 8 > out.len() {
            return out;
        }
        swap4(&mut out, offset);
        swap2(&mut out, offset + 4);
        offset += 8;
    }
    out
}

/// Navmesh connection info: owning navmesh, then three count-prefixed
/// FormID lists (connected meshes, doors connected, doors connecting).
pub fn convert_nvci(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    if out.len() < 4 {
        return out;
    }
    swap4(&mut out, 0);
    let mut offset = 4;
    for _ in 0..3 {
        if offset + 4 > out.len() {
            return out;
        }
        let count = read_be_u32(&out, offset) as usize;
        swap4(&mut out, offset);
        offset += 4;
        for _ in 0..count {
            if offset + 4 > out.len() {
                return out;
            }
            swap4(&mut out, offset);
            offset += 4;
        }
    }
    out
}

/// Navmesh grid: a 36-byte header (cell divisor plus bounds) followed by
/// per-cell triangle index lists. Every trailing field is 16 bits wide, so
/// the count-prefixed lists flatten into one uniform u16 stream.
pub fn convert_nvgd(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let header_words = 9.min(out.len() / 4);
    for i in 0..header_words {
        swap4(&mut out, i * 4);
    }
    let mut offset = header_words * 4;
    while offset + 2 <= out.len() {
        swap2(&mut out, offset);
        offset += 2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nvtr_swaps_and_reorders_trailing_pair() {
        // One triangle: v0..v2, e0..e2, cover_flags, flags (big-endian).
        let data: Vec<u8> = vec![
            0x00, 0x01, 0x00, 0x02, 0x00, 0x03, // vertices
            0x00, 0x04, 0x00, 0x05, 0x00, 0x06, // edges
            0x00, 0xAA, // cover flags
            0x00, 0xBB, // flags
        ];
        let out = convert_nvtr(&data);
        assert_eq!(&out[0..2], &[0x01, 0x00]);
        // PC order: flags first, then cover flags, both little-endian.
        assert_eq!(&out[12..14], &[0xBB, 0x00]);
        assert_eq!(&out[14..16], &[0xAA, 0x00]);
    }

    #[test]
    fn nvdp_zeroes_console_payload() {
        let data: Vec<u8> = vec![0x00, 0x01, 0x02, 0x03, 0x00, 0x07, 0xDE, 0xAD];
        let out = convert_nvdp(&data);
        assert_eq!(&out[0..4], &[0x03, 0x02, 0x01, 0x00]);
        assert_eq!(&out[4..6], &[0x07, 0x00]);
        assert_eq!(&out[6..8], &[0x00, 0x00]);
    }

    #[test]
    fn nvmi_without_island() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_be_bytes()); // flags: no island
        data.extend_from_slice(&0x0100_2030u32.to_be_bytes()); // navmesh
        data.extend_from_slice(&0x0100_2031u32.to_be_bytes()); // location
        data.extend_from_slice(&1i16.to_be_bytes());
        data.extend_from_slice(&(-2i16).to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes()); // one door
        data.extend_from_slice(&0x0100_2032u32.to_be_bytes());
        data.extend_from_slice(&7u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        let out = convert_nvmi(&data);
        assert_eq!(&out[4..8], &0x0100_2030u32.to_le_bytes());
        assert_eq!(&out[12..14], &1i16.to_le_bytes());
        assert_eq!(&out[16..20], &1u32.to_le_bytes());
        assert_eq!(&out[20..24], &0x0100_2032u32.to_le_bytes());
        assert_eq!(&out[24..26], &7u16.to_le_bytes());
    }

    #[test]
    fn nvci_three_lists() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x0100_0001u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&0x0100_0002u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        let out = convert_nvci(&data);
        assert_eq!(&out[0..4], &0x0100_0001u32.to_le_bytes());
        assert_eq!(&out[4..8], &1u32.to_le_bytes());
        assert_eq!(&out[8..12], &0x0100_0002u32.to_le_bytes());
        assert_eq!(&out[12..16], &[0; 4]);
    }

    #[test]
    fn nvgd_header_then_u16_stream() {
        let mut data = Vec::new();
        for word in 0..9u32 {
            data.extend_from_slice(&word.to_be_bytes());
        }
        data.extend_from_slice(&0x0102u16.to_be_bytes());
        data.extend_from_slice(&0x0304u16.to_be_bytes());
        let out = convert_nvgd(&data);
        assert_eq!(&out[0..4], &0u32.to_le_bytes());
        assert_eq!(&out[32..36], &8u32.to_le_bytes());
        assert_eq!(&out[36..38], &0x0102u16.to_le_bytes());
        assert_eq!(&out[38..40], &0x0304u16.to_le_bytes());
    }

    #[test]
    fn truncated_input_survives() {
        let data = vec![0x00, 0x01, 0x02];
        assert_eq!(convert_nvmi(&data), data);
        assert_eq!(convert_nvci(&data), data);
    }
}
