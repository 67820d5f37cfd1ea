//! Record-level conversion: header fix-up, the compression branch, the
//! INFO merge hook, and the linear subrecord walk shared by compressed and
//! uncompressed payloads.

use log::warn;

use crate::bytes::{
    field_header_at, is_valid_signature, read_be_u32, record_header_at, RecordFlags,
    RecordHeader, FIELD_HEADER_SIZE, RECORD_HEADER_SIZE,
};
use crate::compression;
use crate::convert::Converter;
use crate::error::{ConvertError, Result};
use crate::info_merge::{self, MergeAction};
use crate::processor;
use crate::stats::Stats;

/// TES4 flag bit marking the file as Xbox-origin; cleared on output.
pub(crate) const XBOX_FLAG: u32 = 0x10;

/// Converts a record's raw subrecord stream to PC byte order.
///
/// Walk rules: `XXXX` extended sizes are tracked and consumed by the next
/// zero-size subrecord; every other subrecord is re-emitted with its
/// payload converted by the schema processor.
///
/// `strip_wrld_ofst` drops WRLD `OFST` tables. That only happens inside
/// compressed payloads, whose size is recomputed on recompression; an
/// uncompressed WRLD keeps its table so the post-pass can patch it in
/// place (compressed worldspaces are skipped by the rebuilder).
pub(crate) fn convert_record_data(
    rec_sig: [u8; 4],
    data: &[u8],
    strip_wrld_ofst: bool,
    stats: &mut Stats,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut offset = 0;
    let mut pending_extended_size: u32 = 0;
    while let Some(header) = field_header_at(data, offset) {
        offset += FIELD_HEADER_SIZE;
        if header.sig == *b"XXXX" && header.size == 4 && offset + 4 <= data.len() {
            pending_extended_size = read_be_u32(data, offset);
            out.extend_from_slice(b"XXXX");
            out.extend_from_slice(&4u16.to_le_bytes());
            out.extend_from_slice(&pending_extended_size.to_le_bytes());
            offset += 4;
            continue;
        }
        let size = if header.size == 0 && pending_extended_size > 0 {
            let size = pending_extended_size as usize;
            pending_extended_size = 0;
            size
        } else {
            header.size as usize
        };
        let end = (offset + size).min(data.len());
        let payload = &data[offset..end];
        if strip_wrld_ofst && rec_sig == *b"WRLD" && header.sig == *b"OFST" {
            // The Xbox cell ordering is useless on PC; rebuilt post-pass.
            stats.ofst_bytes_stripped += (payload.len() + FIELD_HEADER_SIZE) as u64;
            offset = end;
            continue;
        }
        let converted = processor::convert_subrecord(header.sig, rec_sig, payload, stats);
        out.extend_from_slice(&header.sig);
        // A zero stored size stays zero (the XXXX prefix carries the real
        // length); otherwise the header tracks the converted payload,
        // which override truncation may have shortened.
        let stored_size = if header.size == 0 {
            0
        } else {
            converted.len() as u16
        };
        out.extend_from_slice(&stored_size.to_le_bytes());
        out.extend_from_slice(&converted);
        offset = end;
    }
    out
}

/// Deflates converted record data, or, should deflation ever fail, stores
/// it plain with the compressed flag cleared. A record is never dropped
/// over its compression.
fn recompress_or_store_plain(header: &RecordHeader, flags: &mut u32, converted: Vec<u8>) -> Vec<u8> {
    match compression::compress_record_data(&converted) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(
                "record {:08X}: recompression failed ({}); storing uncompressed",
                header.form_id, err
            );
            *flags &= !RecordFlags::COMPRESSED.bits();
            converted
        }
    }
}

impl<'a> Converter<'a> {
    /// Converts and emits the record at input `offset`. Returns the number
    /// of input bytes consumed. An error means the header itself is
    /// unusable and the caller should resync.
    pub(crate) fn write_record(&mut self, offset: usize) -> Result<usize> {
        let header =
            record_header_at(self.input, offset).ok_or_else(|| ConvertError::Truncated {
                offset,
                needed: RECORD_HEADER_SIZE,
                available: self.input.len().saturating_sub(offset),
            })?;
        let total = header.total_size();
        if !is_valid_signature(&header.sig) || offset + total > self.input.len() {
            return Err(ConvertError::Truncated {
                offset,
                needed: total,
                available: self.input.len().saturating_sub(offset),
            });
        }
        self.stats.count_record(header.sig);

        // Xbox streaming-cache marker; PC has no use for it.
        if header.sig == *b"TOFT" {
            self.stats.toft_markers_skipped += 1;
            return Ok(total);
        }

        let data = &self.input[offset + RECORD_HEADER_SIZE..offset + total];
        let mut flags = header.flags;
        if header.sig == *b"TES4" {
            flags &= !XBOX_FLAG;
        }

        if header.sig == *b"INFO" {
            match self.merger.try_merge(self.input, offset, &mut self.stats) {
                MergeAction::Skip => return Ok(total),
                MergeAction::Merged(merged) => {
                    let payload = if header.is_compressed() {
                        recompress_or_store_plain(&header, &mut flags, merged)
                    } else {
                        merged
                    };
                    self.emit_record_header(&header, flags, payload.len());
                    self.out.extend_from_slice(&payload);
                    return Ok(total);
                }
                MergeAction::NotMerged => {}
            }
        }

        let payload = if header.is_compressed() {
            match compression::decompress_record_data(data) {
                Ok((_, inflated)) => {
                    let converted = self.convert_and_reorder(header.sig, &inflated, true);
                    recompress_or_store_plain(&header, &mut flags, converted)
                }
                Err(err) => {
                    warn!(
                        "record {:08X} at {:#x} failed to inflate ({}); passing through",
                        header.form_id, offset, err
                    );
                    self.stats.decompression_failures += 1;
                    compression::passthrough_record_data(data)
                }
            }
        } else {
            self.convert_and_reorder(header.sig, data, false)
        };

        self.track_output_position(&header);
        self.emit_record_header(&header, flags, payload.len());
        self.out.extend_from_slice(&payload);
        Ok(total)
    }

    fn convert_and_reorder(&mut self, rec_sig: [u8; 4], data: &[u8], compressed: bool) -> Vec<u8> {
        let converted = convert_record_data(rec_sig, data, compressed, &mut self.stats);
        if rec_sig == *b"INFO" {
            info_merge::reorder_info_subrecords(&converted, &mut self.stats)
        } else {
            converted
        }
    }

    /// The OFST post-pass needs to know where WRLD and CELL records landed
    /// in the output; noted before the header is emitted.
    fn track_output_position(&mut self, header: &crate::bytes::RecordHeader) {
        let position = self.out.len();
        match &header.sig {
            b"WRLD" => self.world_positions.push((header.form_id, position)),
            b"CELL" => {
                self.cell_positions.entry(header.form_id).or_insert(position);
            }
            _ => {}
        }
    }

    fn emit_record_header(
        &mut self,
        header: &crate::bytes::RecordHeader,
        flags: u32,
        data_size: usize,
    ) {
        self.out.extend_from_slice(&header.sig);
        self.out.extend_from_slice(&(data_size as u32).to_le_bytes());
        self.out.extend_from_slice(&flags.to_le_bytes());
        self.out.extend_from_slice(&header.form_id.to_le_bytes());
        self.out.extend_from_slice(&header.timestamp.to_le_bytes());
        self.out.extend_from_slice(&header.vcs_info.to_le_bytes());
        self.out.extend_from_slice(&header.version.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be_subrecord(sig: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut reversed = *sig;
        reversed.reverse();
        out.extend_from_slice(&reversed);
        out.extend_from_slice(&(data.len() as u16).to_be_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn stream_converts_and_reserializes() {
        let mut data = Vec::new();
        data.extend_from_slice(&be_subrecord(b"EDID", b"GlowingOne\0"));
        data.extend_from_slice(&be_subrecord(b"EAMT", &[0x12, 0x34]));
        let out = convert_record_data(*b"WEAP", &data, false, &mut Stats::default());
        assert_eq!(&out[0..4], b"EDID");
        assert_eq!(&out[4..6], &11u16.to_le_bytes());
        assert_eq!(&out[6..17], b"GlowingOne\0");
        assert_eq!(&out[17..21], b"EAMT");
        assert_eq!(&out[21..23], &2u16.to_le_bytes());
        assert_eq!(&out[23..25], &[0x34, 0x12]);
    }

    #[test]
    fn stream_strips_wrld_ofst() {
        let mut data = Vec::new();
        data.extend_from_slice(&be_subrecord(b"EDID", b"WastelandNV\0"));
        data.extend_from_slice(&be_subrecord(b"OFST", &[0xAA; 40]));
        let mut stats = Stats::default();
        let out = convert_record_data(*b"WRLD", &data, true, &mut stats);
        assert_eq!(stats.ofst_bytes_stripped, 46);
        assert!(!out.windows(4).any(|w| w == b"OFST"));
        // An uncompressed WRLD keeps the table for in-place patching.
        let out = convert_record_data(*b"WRLD", &data, false, &mut Stats::default());
        assert!(out.windows(4).any(|w| w == b"OFST"));
    }

    #[test]
    fn stream_consumes_extended_size_once() {
        let big = vec![0x5A; 70000];
        let mut data = Vec::new();
        data.extend_from_slice(b"XXXX"); // reversal-invariant signature
        data.extend_from_slice(&4u16.to_be_bytes());
        data.extend_from_slice(&(big.len() as u32).to_be_bytes());
        // Zero-size header, payload carried by the XXXX above.
        let mut reversed = *b"SCDA";
        reversed.reverse();
        data.extend_from_slice(&reversed);
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&big);
        data.extend_from_slice(&be_subrecord(b"EAMT", &[0x01, 0x02]));
        let out = convert_record_data(*b"INFO", &data, false, &mut Stats::default());
        assert_eq!(&out[0..4], b"XXXX");
        assert_eq!(&out[6..10], &(big.len() as u32).to_le_bytes());
        assert_eq!(&out[10..14], b"SCDA");
        assert_eq!(&out[14..16], &0u16.to_le_bytes());
        let tail = &out[16 + big.len()..];
        assert_eq!(&tail[0..4], b"EAMT");
        assert_eq!(&tail[6..8], &[0x02, 0x01]);
    }
}
