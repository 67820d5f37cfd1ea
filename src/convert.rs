//! Top-level conversion driver.
//!
//! Streams the input once, tracking open GRUPs with an explicit stack
//! (deep cell trees would overflow thread stacks if this recursed),
//! reconstructing the WRLD and CELL top-level hierarchies from the
//! [`ConversionIndex`], and dropping the console-side duplicates.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::bytes::{
    group_header_at, is_nested_only_group_type, is_valid_signature, read_be_u16,
    record_header_at, sig_display, signature_at, GROUP_HEADER_SIZE, RECORD_HEADER_SIZE,
};
use crate::error::{ConvertError, Result};
use crate::group::convert_group_label;
use crate::index::{self, ConversionIndex};
use crate::info_merge::InfoMerger;
use crate::stats::Stats;

/// Result of a successful conversion.
#[derive(Debug)]
pub struct Conversion {
    /// The converted PC plugin, byte-layout compatible with the retail
    /// little-endian master file.
    pub output: Vec<u8>,
    pub stats: Stats,
}

/// HEDR versions outside this range mean the header was not big-endian.
const HEDR_VERSION_RANGE: std::ops::RangeInclusive<f32> = 0.5..=10.0;

/// Whether `input` looks like an Xbox 360 (big-endian) master file: a
/// byte-reversed TES4 record whose HEDR version reads sensibly big-endian.
///
/// A PC file fails this check, which is what makes the converter a strict
/// one-way transform; feeding it already-little-endian data is refused
/// rather than double-swapped.
pub fn is_xbox_master_file(input: &[u8]) -> bool {
    if signature_at(input, 0) != Some(*b"TES4") {
        return false;
    }
    if signature_at(input, RECORD_HEADER_SIZE) != Some(*b"HEDR") {
        return false;
    }
    if input.len() < RECORD_HEADER_SIZE + 10 {
        return false;
    }
    let field_size = read_be_u16(input, RECORD_HEADER_SIZE + 4);
    if field_size < 4 {
        return false;
    }
    let at = RECORD_HEADER_SIZE + 6;
    let version = f32::from_be_bytes([input[at], input[at + 1], input[at + 2], input[at + 3]]);
    version.is_finite() && HEDR_VERSION_RANGE.contains(&version)
}

/// A PC-side GRUP whose size field is still pending.
pub(crate) struct OpenGroup {
    pub header_position: usize,
    pub input_end: usize,
}

pub(crate) struct Converter<'a> {
    pub(crate) input: &'a [u8],
    pub(crate) out: Vec<u8>,
    pub(crate) index: ConversionIndex,
    pub(crate) merger: InfoMerger,
    pub(crate) stats: Stats,
    pub(crate) open_groups: Vec<OpenGroup>,
    /// `(form_id, output offset)` of every WRLD record written.
    pub(crate) world_positions: Vec<(u32, usize)>,
    /// Output offset of each CELL record, first occurrence wins.
    pub(crate) cell_positions: HashMap<u32, usize>,
    worlds_rebuilt: bool,
    cells_rebuilt: bool,
    /// Offset of the first resync that found no further GRUP signature.
    failed_resync: Option<usize>,
}

/// Converts an Xbox 360 master file into the PC layout.
///
/// The input is read twice: once by the index builder to reconstruct the
/// logical hierarchy, then by the streaming rewrite. The returned output
/// is complete, with all group sizes patched and OFST tables rebuilt.
pub fn convert(input: &[u8]) -> Result<Conversion> {
    if !is_xbox_master_file(input) {
        return Err(ConvertError::FormatMismatch {
            reason: "TES4 header is not big-endian".into(),
        });
    }
    let mut stats = Stats::default();
    let index = ConversionIndex::build(input, &mut stats);
    let merger = InfoMerger::build(input, &index.info_records);
    let mut converter = Converter {
        input,
        out: Vec::with_capacity(input.len()),
        index,
        merger,
        stats,
        open_groups: Vec::new(),
        world_positions: Vec::new(),
        cell_positions: HashMap::new(),
        worlds_rebuilt: false,
        cells_rebuilt: false,
        failed_resync: None,
    };
    converter.run()?;
    converter.rebuild_ofst_tables();
    info!(
        "converted {} records into {} bytes",
        converter.stats.records_total(),
        converter.out.len()
    );
    Ok(Conversion {
        output: converter.out,
        stats: converter.stats,
    })
}

impl<'a> Converter<'a> {
    fn run(&mut self) -> Result<()> {
        let mut offset = self.write_record(0)?;
        loop {
            self.close_completed_groups(offset);
            if offset + 4 > self.input.len() {
                break;
            }
            let at_top_level = self.open_groups.is_empty();
            let sig = match signature_at(self.input, offset) {
                Some(sig) => sig,
                None => break,
            };

            if sig == *b"TOFT" && at_top_level {
                // Streaming-cache region: everything up to the next group
                // is console-only duplicate data.
                self.stats.toft_markers_skipped += 1;
                match index::find_group_signature(self.input, offset) {
                    Some(next) => {
                        self.stats.bytes_skipped += (next - offset) as u64;
                        debug!("TOFT at {:#x}, skipping to group at {:#x}", offset, next);
                        offset = next;
                        continue;
                    }
                    None => break,
                }
            }

            if sig == *b"GRUP" {
                let header = match group_header_at(self.input, offset) {
                    Some(header) => header,
                    None => break,
                };
                let size = header.size as usize;
                if size < GROUP_HEADER_SIZE || offset + size > self.input.len() {
                    match self.resync_from(offset) {
                        Some(next) => {
                            offset = next;
                            continue;
                        }
                        None => break,
                    }
                }
                if at_top_level && header.group_type == 0 {
                    let label = header.label_signature();
                    if label == *b"WRLD" && !self.worlds_rebuilt {
                        self.worlds_rebuilt = true;
                        self.rebuild_world_groups(header.stamp)?;
                        offset += size;
                        continue;
                    }
                    if label == *b"CELL" && !self.cells_rebuilt {
                        self.cells_rebuilt = true;
                        self.rebuild_interior_groups(header.stamp)?;
                        offset += size;
                        continue;
                    }
                }
                if at_top_level && is_nested_only_group_type(header.group_type) {
                    debug!(
                        "dropping duplicate type-{} group at top level ({:#x})",
                        header.group_type, offset
                    );
                    offset += size;
                    continue;
                }
                // A flat world-children group after the streaming marker;
                // its cells are already in the rebuilt WRLD hierarchy.
                if at_top_level && header.group_type == 1 && self.worlds_rebuilt {
                    debug!("dropping flat world-children group at {:#x}", offset);
                    offset += size;
                    continue;
                }
                let label = convert_group_label(header.group_type, header.label);
                let position = self.write_group_header(
                    header.group_type,
                    label,
                    header.stamp,
                    header.unknown,
                );
                self.open_groups.push(OpenGroup {
                    header_position: position,
                    input_end: offset + size,
                });
                offset += GROUP_HEADER_SIZE;
                continue;
            }

            if at_top_level {
                if !is_valid_signature(&sig) {
                    match self.resync_from(offset) {
                        Some(next) => {
                            offset = next;
                            continue;
                        }
                        None => break,
                    }
                }
                // Valid record at the top level: a console duplicate of
                // something already written inside a group.
                let header = match record_header_at(self.input, offset) {
                    Some(header) => header,
                    None => break,
                };
                if offset + header.total_size() > self.input.len() {
                    match self.resync_from(offset) {
                        Some(next) => {
                            offset = next;
                            continue;
                        }
                        None => break,
                    }
                }
                debug!(
                    "skipping top-level {} record at {:#x}",
                    sig_display(sig),
                    offset
                );
                self.stats.top_level_records_skipped += 1;
                offset += header.total_size();
                continue;
            }

            match self.write_record(offset) {
                Ok(consumed) => offset += consumed,
                Err(err) => {
                    warn!("record at {:#x} unusable ({}), resyncing", offset, err);
                    match self.resync_from(offset) {
                        Some(next) => offset = next,
                        None => break,
                    }
                }
            }
        }
        while let Some(open) = self.open_groups.pop() {
            self.finalize_group(open.header_position);
        }
        // A failed resync with nothing converted beyond the TES4 header
        // means the whole file was unreadable, not locally damaged.
        if let Some(offset) = self.failed_resync {
            if self.stats.groups_written == 0 {
                return Err(ConvertError::UnrecoverableCorruption { offset });
            }
        }
        Ok(())
    }

    /// Seeks the next GRUP signature past a corrupt region. `None` stops
    /// the conversion cleanly at the last good boundary.
    fn resync_from(&mut self, offset: usize) -> Option<usize> {
        self.stats.resyncs += 1;
        let next = index::find_group_signature(self.input, offset + 1);
        match next {
            Some(next) => debug!("resync: {:#x} -> {:#x}", offset, next),
            None => {
                warn!("resync failed at {:#x}; stopping", offset);
                if self.failed_resync.is_none() {
                    self.failed_resync = Some(offset);
                }
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tes4_header(version: f32, big_endian: bool) -> Vec<u8> {
        let mut raw = Vec::new();
        if big_endian {
            raw.extend_from_slice(b"4SET");
        } else {
            raw.extend_from_slice(b"TES4");
        }
        let data_size = 18u32;
        let serialize = |v: u32| {
            if big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            }
        };
        raw.extend_from_slice(&serialize(data_size));
        raw.extend_from_slice(&serialize(0x10)); // flags: Xbox marker
        raw.extend_from_slice(&serialize(0));
        raw.extend_from_slice(&serialize(0));
        raw.extend_from_slice(&[0; 4]); // vcs + version
        if big_endian {
            raw.extend_from_slice(b"RDEH");
            raw.extend_from_slice(&12u16.to_be_bytes());
            raw.extend_from_slice(&version.to_be_bytes());
            raw.extend_from_slice(&8u32.to_be_bytes());
            raw.extend_from_slice(&0x800u32.to_be_bytes());
        } else {
            raw.extend_from_slice(b"HEDR");
            raw.extend_from_slice(&12u16.to_le_bytes());
            raw.extend_from_slice(&version.to_le_bytes());
            raw.extend_from_slice(&8u32.to_le_bytes());
            raw.extend_from_slice(&0x800u32.to_le_bytes());
        }
        raw
    }

    #[test]
    fn detects_big_endian_header() {
        assert!(is_xbox_master_file(&tes4_header(1.34, true)));
        assert!(!is_xbox_master_file(&tes4_header(1.34, false)));
        assert!(!is_xbox_master_file(b"not a plugin"));
        assert!(!is_xbox_master_file(&[]));
    }

    #[test]
    fn refuses_pc_input() {
        match convert(&tes4_header(1.34, false)) {
            Err(ConvertError::FormatMismatch { .. }) => {}
            other => panic!("expected FormatMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn garbage_with_no_groups_is_unrecoverable() {
        let mut raw = tes4_header(1.34, true);
        for _ in 0..8 {
            raw.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        }
        match convert(&raw) {
            Err(ConvertError::UnrecoverableCorruption { offset }) => {
                assert_eq!(offset, 42);
            }
            other => panic!(
                "expected UnrecoverableCorruption, got {:?}",
                other.map(|_| ())
            ),
        }
    }

    #[test]
    fn converts_bare_header() {
        let conversion = convert(&tes4_header(1.34, true)).unwrap();
        let out = conversion.output;
        assert_eq!(&out[0..4], b"TES4");
        // Data size little-endian, Xbox flag cleared.
        assert_eq!(&out[4..8], &18u32.to_le_bytes());
        assert_eq!(&out[8..12], &0u32.to_le_bytes());
        // HEDR version serialized little-endian.
        assert_eq!(&out[24..28], b"HEDR");
        let version = f32::from_le_bytes([out[30], out[31], out[32], out[33]]);
        assert!((version - 1.34).abs() < 1e-6);
        assert_eq!(conversion.stats.record_counts["TES4"], 1);
    }
}
