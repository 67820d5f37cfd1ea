//! Applies a schema to a subrecord payload, producing the little-endian
//! byte layout the PC runtime expects.
//!
//! Dispatch order: special overrides (non-uniform Xbox layouts a generic
//! schema would corrupt), then the string-subrecord set, then the registry
//! lookup, then the navmesh custom parsers, and finally a permissive
//! size-based fallback for subrecords nothing recognised.

use log::debug;

use crate::bytes::{sig_display, swap2, swap4, swap8};
use crate::navmesh;
use crate::schema::{self, Field, FieldType, Layout};
use crate::stats::Stats;

/// Converts one subrecord payload from Xbox to PC byte order.
///
/// `rec` is the signature of the containing record; several subrecord
/// signatures mean different things in different record types.
pub fn convert_subrecord(sig: [u8; 4], rec: [u8; 4], data: &[u8], stats: &mut Stats) -> Vec<u8> {
    if let Some(converted) = apply_override(sig, rec, data) {
        return converted;
    }
    let registry = schema::registry();
    if registry.is_string(sig, rec) {
        return data.to_vec();
    }
    if let Some(layout) = registry.lookup(sig, rec, data.len()) {
        return apply_layout(layout, data);
    }
    match &sig {
        // Variable-length navmesh map subrecords get dedicated parsers.
        b"NVMI" => navmesh::convert_nvmi(data),
        b"NVCI" => navmesh::convert_nvci(data),
        b"NVGD" => navmesh::convert_nvgd(data),
        _ => unknown_fallback(sig, rec, data, stats),
    }
}

/// Subrecords whose Xbox layout deviates from anything a flat field list
/// can express. Each arm exists because the generic path corrupts it.
fn apply_override(sig: [u8; 4], rec: [u8; 4], data: &[u8]) -> Option<Vec<u8>> {
    match (&sig, &rec, data.len()) {
        // Package data interleaves the flag byte with the type byte.
        (b"PKDT", _, 12) => {
            let mut out = data.to_vec();
            out.swap(0, 3);
            swap2(&mut out, 1);
            swap2(&mut out, 6);
            swap2(&mut out, 8);
            Some(out)
        }
        // PC perks use a 4-byte DATA; the Xbox build pads a fifth byte.
        (b"DATA", b"PERK", 5) => {
            let mut out = data.to_vec();
            if out[4] == 0 {
                out.truncate(4);
            }
            Some(out)
        }
        (b"DATA", b"PERK", 8) => {
            let mut out = data.to_vec();
            swap4(&mut out, 0);
            Some(out)
        }
        // PC idle animations use a 6-byte DATA, already byte-ordered.
        (b"DATA", b"IDLE", 8) => Some(data[..6].to_vec()),
        // First word is already little-endian.
        (b"DNAM", b"IMAD", 244) => {
            let mut out = data.to_vec();
            let mut offset = 4;
            while offset + 4 <= out.len() {
                swap4(&mut out, offset);
                offset += 4;
            }
            Some(out)
        }
        // Mixed layout: two swapped ranges, one already-little-endian
        // range, two lone words, zero filler elsewhere.
        (b"INAM", b"WTHR", 304) => {
            let mut out = data.to_vec();
            let mut offset = 0;
            while offset < 84 {
                swap4(&mut out, offset);
                offset += 4;
            }
            let mut offset = 100;
            while offset < 128 {
                swap4(&mut out, offset);
                offset += 4;
            }
            swap4(&mut out, 152);
            swap4(&mut out, 208);
            Some(out)
        }
        // Four-byte TNAM in a NOTE is a FormID; the string TNAM of the
        // same name is any other length.
        (b"TNAM", b"NOTE", 4) => {
            let mut out = data.to_vec();
            swap4(&mut out, 0);
            Some(out)
        }
        (b"NVTR", _, _) => Some(navmesh::convert_nvtr(data)),
        (b"NVDP", _, _) => Some(navmesh::convert_nvdp(data)),
        _ => None,
    }
}

fn apply_layout(layout: Layout, data: &[u8]) -> Vec<u8> {
    match layout {
        Layout::String | Layout::Bytes => data.to_vec(),
        Layout::FormIdArray | Layout::FloatArray => {
            let mut out = data.to_vec();
            let mut offset = 0;
            while offset + 4 <= out.len() {
                swap4(&mut out, offset);
                offset += 4;
            }
            out
        }
        Layout::Fields(fields) => {
            let mut out = data.to_vec();
            apply_fields(&mut out, 0, fields);
            out
        }
        Layout::Repeat(fields) => {
            let mut out = data.to_vec();
            let element_size: usize = fields.iter().map(|f| f.ty.size()).sum();
            if element_size == 0 {
                return out;
            }
            let count = out.len() / element_size;
            for i in 0..count {
                apply_fields(&mut out, i * element_size, fields);
            }
            out
        }
    }
}

/// Applies a field sequence starting at `base`. A field extending past the
/// end of the buffer stops processing; the remainder is left untouched.
fn apply_fields(buf: &mut [u8], base: usize, fields: &[Field]) {
    let mut offset = base;
    for field in fields {
        let size = field.ty.size();
        if offset + size > buf.len() {
            break;
        }
        apply_field(buf, offset, field.ty);
        offset += size;
    }
}

fn apply_field(buf: &mut [u8], offset: usize, ty: FieldType) {
    match ty {
        FieldType::UInt16 | FieldType::Int16 => swap2(buf, offset),
        FieldType::UInt32
        | FieldType::Int32
        | FieldType::Float
        | FieldType::FormId => swap4(buf, offset),
        FieldType::UInt64 | FieldType::Int64 | FieldType::Double => swap8(buf, offset),
        FieldType::Vec3 => {
            for i in 0..3 {
                swap4(buf, offset + i * 4);
            }
        }
        FieldType::Quaternion => {
            for i in 0..4 {
                swap4(buf, offset + i * 4);
            }
        }
        FieldType::PosRot => {
            for i in 0..6 {
                swap4(buf, offset + i * 4);
            }
        }
        FieldType::ColorArgb => {
            let alpha = buf[offset];
            buf[offset] = buf[offset + 1];
            buf[offset + 1] = buf[offset + 2];
            buf[offset + 2] = buf[offset + 3];
            buf[offset + 3] = alpha;
        }
        FieldType::UInt32WordSwapped => {
            swap2(buf, offset);
            swap2(buf, offset + 2);
        }
        FieldType::PlatformByte(value) => buf[offset] = value,
        FieldType::UInt8
        | FieldType::Int8
        | FieldType::ByteArray(_)
        | FieldType::Padding(_)
        | FieldType::ColorRgba
        | FieldType::UInt16LittleEndian
        | FieldType::FormIdLittleEndian => {}
    }
}

/// No schema, no override: 2- and 4-byte payloads are almost always a lone
/// u16/u32 and are swapped; anything else passes through unchanged.
fn unknown_fallback(sig: [u8; 4], rec: [u8; 4], data: &[u8], stats: &mut Stats) -> Vec<u8> {
    match data.len() {
        0 => Vec::new(),
        2 => {
            let mut out = data.to_vec();
            swap2(&mut out, 0);
            out
        }
        4 => {
            let mut out = data.to_vec();
            swap4(&mut out, 0);
            out
        }
        len => {
            stats.schema_misses += 1;
            debug!(
                "no schema for {} in {} ({} bytes), passing through",
                sig_display(sig),
                sig_display(rec),
                len
            );
            data.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(sig: &[u8; 4], rec: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut stats = Stats::default();
        convert_subrecord(*sig, *rec, data, &mut stats)
    }

    #[test]
    fn two_byte_field_swap() {
        assert_eq!(convert(b"EAMT", b"WEAP", &[0x12, 0x34]), vec![0x34, 0x12]);
    }

    #[test]
    fn ctda_condition() {
        let mut data = vec![0u8; 28];
        data[0] = 2; // condition type, single byte
        data[4..8].copy_from_slice(&[0x41, 0x20, 0x00, 0x00]); // 10.0 BE
        data[8..10].copy_from_slice(&[0x00, 0x05]); // function index BE
        let out = convert(b"CTDA", b"INFO", &data);
        assert_eq!(&out[0..4], &[2, 0, 0, 0]);
        assert_eq!(&out[4..8], &[0x00, 0x00, 0x20, 0x41]);
        assert_eq!(f32::from_le_bytes([out[4], out[5], out[6], out[7]]), 10.0);
        assert_eq!(&out[8..10], &[0x05, 0x00]);
    }

    #[test]
    fn strings_pass_through() {
        let data = b"SomeEditorId\0";
        assert_eq!(convert(b"EDID", b"WEAP", data), data.to_vec());
        assert_eq!(convert(b"RNAM", b"INFO", b"prompt\0"), b"prompt\0".to_vec());
    }

    #[test]
    fn formid_array() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x00112233u32.to_be_bytes());
        data.extend_from_slice(&0x44556677u32.to_be_bytes());
        let out = convert(b"XCLR", b"CELL", &data);
        assert_eq!(&out[0..4], &0x00112233u32.to_le_bytes());
        assert_eq!(&out[4..8], &0x44556677u32.to_le_bytes());
    }

    #[test]
    fn pkdt_override() {
        let data: Vec<u8> = vec![
            0xAA, // swapped with byte 3
            0x01, 0x02, // u16 at offset 1
            0xBB, 0x00, 0x00, // byte 3 + padding
            0x03, 0x04, // u16 at offset 6
            0x05, 0x06, // u16 at offset 8
            0x00, 0x00,
        ];
        let out = convert(b"PKDT", b"PACK", &data);
        assert_eq!(out[0], 0xBB);
        assert_eq!(out[3], 0xAA);
        assert_eq!(&out[1..3], &[0x02, 0x01]);
        assert_eq!(&out[6..8], &[0x04, 0x03]);
        assert_eq!(&out[8..10], &[0x06, 0x05]);
    }

    #[test]
    fn perk_data_truncation() {
        let out = convert(b"DATA", b"PERK", &[1, 2, 3, 4, 0]);
        assert_eq!(out, vec![1, 2, 3, 4]);
        // Nonzero trailer is meaningful and kept.
        let out = convert(b"DATA", b"PERK", &[1, 2, 3, 4, 9]);
        assert_eq!(out, vec![1, 2, 3, 4, 9]);
        let out = convert(b"DATA", b"PERK", &[0, 0, 0, 7, 1, 2, 3, 4]);
        assert_eq!(out, vec![7, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn idle_data_truncation() {
        let out = convert(b"DATA", b"IDLE", &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn note_tnam_disambiguation() {
        // Four bytes: a FormID, swapped.
        let out = convert(b"TNAM", b"NOTE", &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(out, vec![0x04, 0x03, 0x02, 0x01]);
        // Any other length: note text, untouched.
        let out = convert(b"TNAM", b"NOTE", b"some note text\0");
        assert_eq!(out, b"some note text\0".to_vec());
    }

    #[test]
    fn wthr_inam_ranges() {
        let data = vec![0x01u8; 304];
        let out = convert(b"INAM", b"WTHR", &data);
        assert_eq!(out.len(), 304);
        // All-ones input is swap-invariant; spot-check the untouched
        // little-endian hole instead.
        let mut data = vec![0u8; 304];
        data[0] = 0xAB;
        data[84] = 0xCD;
        data[100] = 0xEF;
        let out = convert(b"INAM", b"WTHR", &data);
        assert_eq!(out[3], 0xAB); // inside swapped range [0, 84)
        assert_eq!(out[84], 0xCD); // hole [84, 100) untouched
        assert_eq!(out[103], 0xEF); // inside swapped range [100, 128)
    }

    #[test]
    fn word_swapped_u32() {
        let mut data = vec![0u8; 20];
        data[0..4].copy_from_slice(&[0x00, 0x12, 0x00, 0x34]);
        let out = convert(b"DATA", b"RGDL", &data);
        assert_eq!(&out[0..4], &[0x12, 0x00, 0x34, 0x00]);
    }

    #[test]
    fn argb_rotation() {
        let mut data = vec![0u8; 36];
        data[32..36].copy_from_slice(&[0xAA, 0x11, 0x22, 0x33]); // ARGB
        let out = convert(b"DODT", b"IPCT", &data);
        assert_eq!(&out[32..36], &[0x11, 0x22, 0x33, 0xAA]); // RGBA
    }

    #[test]
    fn formid_little_endian_untouched() {
        // WEAP DNAM projectile FormID at offset 36 is already PC order.
        let mut data = vec![0u8; 204];
        data[36..40].copy_from_slice(&[0x0D, 0x0C, 0x0B, 0x0A]);
        data[16..20].copy_from_slice(&1.5f32.to_be_bytes()); // min spread
        let out = convert(b"DNAM", b"WEAP", &data);
        assert_eq!(&out[36..40], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(
            f32::from_le_bytes([out[16], out[17], out[18], out[19]]),
            1.5
        );
    }

    #[test]
    fn truncated_buffer_stops_at_field_boundary() {
        // An OBND cut to 7 bytes converts three u16s and leaves the odd
        // trailing byte alone.
        let data = [0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x07];
        let out = convert(b"OBND", b"STAT", &data);
        assert_eq!(out, vec![0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x07]);
    }

    #[test]
    fn repeating_array() {
        // Two VTXT entries of 8 bytes each.
        let mut data = Vec::new();
        for i in 0..2u16 {
            data.extend_from_slice(&(0x0100 + i).to_be_bytes());
            data.extend_from_slice(&[0, 0]);
            data.extend_from_slice(&0.5f32.to_be_bytes());
        }
        let out = convert(b"VTXT", b"LAND", &data);
        assert_eq!(&out[0..2], &0x0100u16.to_le_bytes());
        assert_eq!(&out[8..10], &0x0101u16.to_le_bytes());
        assert_eq!(f32::from_le_bytes([out[4], out[5], out[6], out[7]]), 0.5);
    }

    #[test]
    fn unknown_fallback_policy() {
        assert_eq!(convert(b"ZZZQ", b"WEAP", &[]), Vec::<u8>::new());
        assert_eq!(convert(b"ZZZQ", b"WEAP", &[1, 2]), vec![2, 1]);
        assert_eq!(convert(b"ZZZQ", b"WEAP", &[1, 2, 3, 4]), vec![4, 3, 2, 1]);
        assert_eq!(
            convert(b"ZZZQ", b"WEAP", &[1, 2, 3, 4, 5]),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn land_platform_byte() {
        let mut data = vec![0u8; 8];
        data[0..4].copy_from_slice(&0x01002233u32.to_be_bytes());
        data[4] = 2; // quadrant
        data[5] = 0xFF; // console-only flag byte
        data[6..8].copy_from_slice(&1i16.to_be_bytes());
        let out = convert(b"ATXT", b"LAND", &data);
        assert_eq!(&out[0..4], &0x01002233u32.to_le_bytes());
        assert_eq!(out[4], 2);
        assert_eq!(out[5], 0); // overwritten with the PC value
        assert_eq!(&out[6..8], &1i16.to_le_bytes());
    }
}
