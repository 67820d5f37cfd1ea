use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Counters accumulated over one conversion.
///
/// Owned by the conversion task rather than shared globally so that multiple
/// files can be converted concurrently by a host without interference.
#[derive(Debug, Default, Serialize)]
pub struct Stats {
    /// Converted records per record type.
    pub record_counts: BTreeMap<String, u64>,
    /// Worldspaces discovered by the index builder.
    pub worlds_indexed: u64,
    /// Cells discovered by the index builder.
    pub cells_indexed: u64,
    /// GRUP headers written to the output.
    pub groups_written: u64,
    /// Times the driver lost the record stream and seeked to the next GRUP.
    pub resyncs: u64,
    /// Xbox duplicate records dropped at the top level.
    pub top_level_records_skipped: u64,
    /// TOFT streaming-cache markers skipped.
    pub toft_markers_skipped: u64,
    /// Bytes scanned over while seeking the next GRUP past a TOFT region.
    pub bytes_skipped: u64,
    /// Compressed records whose payload failed to inflate and was passed
    /// through untouched.
    pub decompression_failures: u64,
    /// Subrecords with no schema, no override, and no size-based fallback.
    pub schema_misses: u64,
    /// Split base/response INFO pairs reassembled into single PC records.
    pub info_pairs_merged: u64,
    /// Unpaired INFO records run through the subrecord reorder pass.
    pub info_records_reordered: u64,
    /// Worldspace OFST tables regenerated in the post-pass.
    pub ofst_tables_rebuilt: u64,
    /// Bytes of Xbox OFST subrecord data stripped from WRLD records.
    pub ofst_bytes_stripped: u64,
}

impl Stats {
    pub fn count_record(&mut self, sig: [u8; 4]) {
        let key = crate::bytes::sig_display(sig);
        *self.record_counts.entry(key).or_insert(0) += 1;
    }

    pub fn records_total(&self) -> u64 {
        self.record_counts.values().sum()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "records converted: {}", self.records_total())?;
        writeln!(f, "worlds indexed: {}", self.worlds_indexed)?;
        writeln!(f, "cells indexed: {}", self.cells_indexed)?;
        writeln!(f, "groups written: {}", self.groups_written)?;
        writeln!(f, "INFO pairs merged: {}", self.info_pairs_merged)?;
        writeln!(f, "INFO records reordered: {}", self.info_records_reordered)?;
        writeln!(f, "OFST tables rebuilt: {}", self.ofst_tables_rebuilt)?;
        writeln!(f, "OFST bytes stripped: {}", self.ofst_bytes_stripped)?;
        writeln!(f, "TOFT markers skipped: {}", self.toft_markers_skipped)?;
        writeln!(f, "bytes skipped: {}", self.bytes_skipped)?;
        writeln!(
            f,
            "top-level records skipped: {}",
            self.top_level_records_skipped
        )?;
        writeln!(f, "resyncs: {}", self.resyncs)?;
        writeln!(
            f,
            "decompression failures: {}",
            self.decompression_failures
        )?;
        writeln!(f, "schema misses: {}", self.schema_misses)?;
        for (sig, count) in &self.record_counts {
            writeln!(f, "  {:<4} {:>8}", sig, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counting() {
        let mut stats = Stats::default();
        stats.count_record(*b"CELL");
        stats.count_record(*b"CELL");
        stats.count_record(*b"WRLD");
        assert_eq!(stats.record_counts["CELL"], 2);
        assert_eq!(stats.record_counts["WRLD"], 1);
        assert_eq!(stats.records_total(), 3);
    }
}
