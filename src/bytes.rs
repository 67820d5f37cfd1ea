//! Primitive byte operations shared by every stage of the pipeline: in-place
//! endian swaps, big-endian reads, and signature handling.
//!
//! Xbox 360 plugins store every 4-byte signature with its bytes reversed
//! relative to the PC layout (`GRUP` on disk reads `PURG`). The canonical
//! in-memory representation throughout this crate is the PC ordering.

use nom::{
    bytes::complete::take,
    combinator::map,
    number::complete::{be_u16, be_u32},
    IResult,
};

pub const RECORD_HEADER_SIZE: usize = 24;
pub const GROUP_HEADER_SIZE: usize = 24;
pub const FIELD_HEADER_SIZE: usize = 6;

bitflags! {
    pub struct RecordFlags: u32 {
        const MASTER_FILE = 0x00000001;
        const XBOX = 0x00000010;
        const DELETED = 0x00000020;
        const BORDER_REGION = 0x00000040;
        const TURN_OFF_FIRE = 0x00000080;
        const INACCESSIBLE = 0x00000100;
        const CASTS_SHADOWS = 0x00000200;
        const PERSISTENT_REFR = 0x00000400;
        const INITIALLY_DISABLED = 0x00000800;
        const IGNORED = 0x00001000;
        const VISIBLE_WHEN_DISTANT = 0x00008000;
        const COMPRESSED = 0x00040000;
        const CANT_WAIT = 0x00080000;
    }
}

/// Main record header, 24 bytes on both platforms.
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    pub sig: [u8; 4],
    pub data_size: u32,
    /// Raw flag word. Unknown bits must survive the round trip, so the raw
    /// value is kept and [`RecordFlags`] is derived on demand.
    pub flags: u32,
    pub form_id: u32,
    pub timestamp: u32,
    pub vcs_info: u16,
    pub version: u16,
}

impl RecordHeader {
    pub fn record_flags(&self) -> RecordFlags {
        // Okay to truncate since we only care about bits we know about and
        // don't want to crash on unknown bits.
        RecordFlags::from_bits_truncate(self.flags)
    }

    pub fn is_compressed(&self) -> bool {
        self.record_flags().contains(RecordFlags::COMPRESSED)
    }

    /// Total on-disk footprint of the record, header included.
    pub fn total_size(&self) -> usize {
        RECORD_HEADER_SIZE + self.data_size as usize
    }
}

/// GRUP header, 24 bytes. The label is kept as stored; interpretation
/// depends on `group_type`.
#[derive(Debug, Clone, Copy)]
pub struct GroupHeader {
    /// Total size of the group *including* this header.
    pub size: u32,
    pub label: [u8; 4],
    pub group_type: u32,
    pub stamp: u32,
    pub unknown: u32,
}

impl GroupHeader {
    /// The label of a top-level group is a record signature, byte-reversed
    /// on disk like every other signature.
    pub fn label_signature(&self) -> [u8; 4] {
        reverse_sig(self.label)
    }

    /// The label of group types 1 and 6..=10 is a FormID stored big-endian.
    pub fn label_form_id(&self) -> u32 {
        u32::from_be_bytes(self.label)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldHeader {
    pub sig: [u8; 4],
    pub size: u16,
}

/// Group types 2..=10 never legitimately appear at the top level on PC;
/// Xbox files duplicate them there and the duplicates are dropped.
pub fn is_nested_only_group_type(group_type: u32) -> bool {
    (2..=10).contains(&group_type)
}

pub fn reverse_sig(sig: [u8; 4]) -> [u8; 4] {
    [sig[3], sig[2], sig[1], sig[0]]
}

/// A usable signature byte is an upper-case letter, a digit, or the
/// underscore a handful of record types carry (`NPC_`).
pub fn is_valid_signature(sig: &[u8; 4]) -> bool {
    sig.iter()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
}

/// Canonical (PC-order) signature at `offset`, or `None` past the end.
pub fn signature_at(input: &[u8], offset: usize) -> Option<[u8; 4]> {
    let bytes = input.get(offset..offset + 4)?;
    Some([bytes[3], bytes[2], bytes[1], bytes[0]])
}

pub fn sig_display(sig: [u8; 4]) -> String {
    sig.iter()
        .map(|&b| {
            if b.is_ascii_graphic() {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

pub fn swap2(buf: &mut [u8], offset: usize) {
    buf.swap(offset, offset + 1);
}

pub fn swap4(buf: &mut [u8], offset: usize) {
    buf[offset..offset + 4].reverse();
}

pub fn swap8(buf: &mut [u8], offset: usize) {
    buf[offset..offset + 8].reverse();
}

pub fn read_be_u16(input: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([input[offset], input[offset + 1]])
}

pub fn read_be_u32(input: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        input[offset],
        input[offset + 1],
        input[offset + 2],
        input[offset + 3],
    ])
}

pub fn read_le_u16(input: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([input[offset], input[offset + 1]])
}

pub fn read_le_u32(input: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        input[offset],
        input[offset + 1],
        input[offset + 2],
        input[offset + 3],
    ])
}

/// Grid coordinates are stored as big-endian u32 but are signed on PC.
pub fn sign_extend(v: u32) -> i32 {
    v as i32
}

/// Euclidean division rounding toward negative infinity, used for cell
/// block/sub-block assignment: `floor_div(-1, 32) == -1`.
pub fn floor_div(n: i32, d: i32) -> i32 {
    let q = n / d;
    if n % d != 0 && (n < 0) != (d < 0) {
        q - 1
    } else {
        q
    }
}

fn parse_signature(input: &[u8]) -> IResult<&[u8], [u8; 4]> {
    map(take(4usize), |bytes: &[u8]| {
        [bytes[3], bytes[2], bytes[1], bytes[0]]
    })(input)
}

/// Parses a big-endian record header from the start of `input`.
pub fn parse_record_header(input: &[u8]) -> IResult<&[u8], RecordHeader> {
    let (input, sig) = parse_signature(input)?;
    let (input, data_size) = be_u32(input)?;
    let (input, flags) = be_u32(input)?;
    let (input, form_id) = be_u32(input)?;
    let (input, timestamp) = be_u32(input)?;
    let (input, vcs_info) = be_u16(input)?;
    let (input, version) = be_u16(input)?;
    Ok((
        input,
        RecordHeader {
            sig,
            data_size,
            flags,
            form_id,
            timestamp,
            vcs_info,
            version,
        },
    ))
}

/// Parses a big-endian GRUP header. The caller has already matched the
/// `GRUP` signature; this consumes all 24 bytes.
pub fn parse_group_header(input: &[u8]) -> IResult<&[u8], GroupHeader> {
    let (input, _) = take(4usize)(input)?;
    let (input, size) = be_u32(input)?;
    let (input, label) = map(take(4usize), |bytes: &[u8]| {
        [bytes[0], bytes[1], bytes[2], bytes[3]]
    })(input)?;
    let (input, group_type) = be_u32(input)?;
    let (input, stamp) = be_u32(input)?;
    let (input, unknown) = be_u32(input)?;
    Ok((
        input,
        GroupHeader {
            size,
            label,
            group_type,
            stamp,
            unknown,
        },
    ))
}

/// Parses a big-endian subrecord header (signature + 16-bit size).
pub fn parse_field_header(input: &[u8]) -> IResult<&[u8], FieldHeader> {
    let (input, sig) = parse_signature(input)?;
    let (input, size) = be_u16(input)?;
    Ok((input, FieldHeader { sig, size }))
}

/// Record header at an absolute offset, `None` when the header would run
/// past the end of the buffer.
pub fn record_header_at(input: &[u8], offset: usize) -> Option<RecordHeader> {
    let slice = input.get(offset..offset + RECORD_HEADER_SIZE)?;
    parse_record_header(slice).ok().map(|(_, header)| header)
}

/// Group header at an absolute offset.
pub fn group_header_at(input: &[u8], offset: usize) -> Option<GroupHeader> {
    let slice = input.get(offset..offset + GROUP_HEADER_SIZE)?;
    parse_group_header(slice).ok().map(|(_, header)| header)
}

/// Subrecord header at an absolute offset.
pub fn field_header_at(input: &[u8], offset: usize) -> Option<FieldHeader> {
    let slice = input.get(offset..offset + FIELD_HEADER_SIZE)?;
    parse_field_header(slice).ok().map(|(_, header)| header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps() {
        let mut buf = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0];
        swap2(&mut buf, 0);
        assert_eq!(&buf[..2], &[0x34, 0x12]);
        let mut buf = [0x12, 0x34, 0x56, 0x78];
        swap4(&mut buf, 0);
        assert_eq!(buf, [0x78, 0x56, 0x34, 0x12]);
        let mut buf = [1, 2, 3, 4, 5, 6, 7, 8];
        swap8(&mut buf, 0);
        assert_eq!(buf, [8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn signature_reversal() {
        assert_eq!(reverse_sig(*b"PURG"), *b"GRUP");
        assert_eq!(signature_at(b"PURGxxxx", 0), Some(*b"GRUP"));
    }

    #[test]
    fn signature_validity() {
        assert!(is_valid_signature(b"CELL"));
        assert!(is_valid_signature(b"NPC_"));
        assert!(is_valid_signature(b"NAM0"));
        assert!(!is_valid_signature(b"ab\x00d"));
        assert!(!is_valid_signature(&[0, 0, 0, 0]));
    }

    #[test]
    fn floor_div_rounds_toward_negative_infinity() {
        assert_eq!(floor_div(-1, 32), -1);
        assert_eq!(floor_div(-32, 32), -1);
        assert_eq!(floor_div(-33, 32), -2);
        assert_eq!(floor_div(31, 32), 0);
        assert_eq!(floor_div(-1, 8), -1);
        assert_eq!(floor_div(7, 8), 0);
    }

    #[test]
    fn record_header_round_trip() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"PAEW"); // WEAP reversed
        raw.extend_from_slice(&0x100u32.to_be_bytes());
        raw.extend_from_slice(&0x00040000u32.to_be_bytes());
        raw.extend_from_slice(&0x0001A2B3u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&0u16.to_be_bytes());
        raw.extend_from_slice(&15u16.to_be_bytes());
        let header = record_header_at(&raw, 0).unwrap();
        assert_eq!(header.sig, *b"WEAP");
        assert_eq!(header.data_size, 0x100);
        assert!(header.is_compressed());
        assert_eq!(header.form_id, 0x0001A2B3);
        assert_eq!(header.version, 15);
    }

    #[test]
    fn group_header_parse() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"PURG");
        raw.extend_from_slice(&0x40u32.to_be_bytes());
        raw.extend_from_slice(&0x00010203u32.to_be_bytes());
        raw.extend_from_slice(&6u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        let header = group_header_at(&raw, 0).unwrap();
        assert_eq!(header.size, 0x40);
        assert_eq!(header.group_type, 6);
        assert_eq!(header.label_form_id(), 0x00010203);
    }
}
