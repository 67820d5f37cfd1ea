//! Reconstruction of the logical worldspace/cell hierarchy from the
//! console-mangled file layout.
//!
//! The Xbox build scatters the pieces the PC loader expects to find in one
//! place: cell-children groups appear far from their cells, an entire
//! world-children group can sit flatly after the `TOFT` streaming marker,
//! and nested-only group types are duplicated at the top level. Three scan
//! phases put the picture back together before any output is written.

use std::collections::{HashMap, HashSet};

use encoding_rs::WINDOWS_1252;
use log::debug;

use crate::bytes::{
    group_header_at, is_valid_signature, record_header_at, sign_extend, signature_at,
    GROUP_HEADER_SIZE, RECORD_HEADER_SIZE,
};
use crate::compression;
use crate::info_merge::split_subrecords;
use crate::stats::Stats;

/// Below this many indexed cells the builder assumes the nested scan lost
/// track of the layout and falls back to a brute-force CELL sweep.
const MIN_EXPECTED_CELLS: usize = 1000;

#[derive(Debug, Clone)]
pub(crate) struct WorldEntry {
    pub form_id: u32,
    pub offset: usize,
    /// Editor ID, for diagnostics only.
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct CellEntry {
    pub form_id: u32,
    pub offset: usize,
    pub is_exterior: bool,
    pub grid: Option<(i32, i32)>,
    pub world_id: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct GrupEntry {
    pub group_type: u32,
    pub offset: usize,
    pub size: usize,
}

/// Everything pass one learned about the input, consumed by the writers.
#[derive(Debug, Default)]
pub(crate) struct ConversionIndex {
    pub worlds: Vec<WorldEntry>,
    pub cells: HashMap<u32, CellEntry>,
    /// Exterior cell FormIDs per world, unsorted (the group writer orders).
    pub world_cells: HashMap<u32, Vec<u32>>,
    pub interior_cells: Vec<u32>,
    /// Cell-children groups keyed by `(cell FormID, group type 8..=10)`.
    /// Multiple entries per key are normal; the console scatters them.
    pub cell_children: HashMap<(u32, u32), Vec<GrupEntry>>,
    /// `(form_id, offset)` of every INFO record, for the merge pairing.
    pub info_records: Vec<(u32, usize)>,
    pub first_toft: Option<usize>,
}

impl ConversionIndex {
    pub(crate) fn build(input: &[u8], stats: &mut Stats) -> ConversionIndex {
        let mut builder = IndexBuilder {
            input,
            index: ConversionIndex::default(),
            seen_group_offsets: HashSet::new(),
            phase1_end: 0,
        };
        builder.nested_scan(stats);
        builder.flat_scan(stats);
        builder.comprehensive_scan();
        builder.fallbacks();
        builder.finalize(stats)
    }

    pub(crate) fn has_cell_children(&self, form_id: u32) -> bool {
        (8..=10).any(|t| self.cell_children.contains_key(&(form_id, t)))
    }
}

struct IndexBuilder<'a> {
    input: &'a [u8],
    index: ConversionIndex,
    seen_group_offsets: HashSet<usize>,
    phase1_end: usize,
}

struct Frame {
    end: usize,
    group_type: u32,
    label: u32,
}

impl<'a> IndexBuilder<'a> {
    /// Phase 1: walk the nested record/group structure from the end of the
    /// TES4 header, stopping at the first top-level TOFT marker.
    fn nested_scan(&mut self, stats: &mut Stats) {
        let mut offset = match record_header_at(self.input, 0) {
            Some(tes4) => tes4.total_size(),
            None => return,
        };
        let mut stack: Vec<Frame> = Vec::new();
        while offset + 4 <= self.input.len() {
            while stack.last().map_or(false, |frame| offset >= frame.end) {
                stack.pop();
            }
            let sig = match signature_at(self.input, offset) {
                Some(sig) => sig,
                None => break,
            };
            if sig == *b"GRUP" {
                let header = match group_header_at(self.input, offset) {
                    Some(header) => header,
                    None => break,
                };
                let size = header.size as usize;
                if size < GROUP_HEADER_SIZE
                    || offset + size > self.input.len()
                    || header.group_type > 10
                {
                    stats.resyncs += 1;
                    match find_group_signature(self.input, offset + 1) {
                        Some(next) => {
                            offset = next;
                            continue;
                        }
                        None => break,
                    }
                }
                self.register_group(offset, &header);
                stack.push(Frame {
                    end: offset + size,
                    group_type: header.group_type,
                    label: header.label_form_id(),
                });
                offset += GROUP_HEADER_SIZE;
                continue;
            }
            if !is_valid_signature(&sig) {
                stats.resyncs += 1;
                match find_group_signature(self.input, offset + 1) {
                    Some(next) => {
                        offset = next;
                        continue;
                    }
                    None => break,
                }
            }
            let header = match record_header_at(self.input, offset) {
                Some(header) => header,
                None => break,
            };
            if offset + header.total_size() > self.input.len() {
                stats.resyncs += 1;
                match find_group_signature(self.input, offset + 1) {
                    Some(next) => {
                        offset = next;
                        continue;
                    }
                    None => break,
                }
            }
            if sig == *b"TOFT" && stack.is_empty() {
                // Console streaming boundary; everything after it is laid
                // out flat and handled by phase 2.
                self.index.first_toft = Some(offset);
                break;
            }
            match &sig {
                b"WRLD" => self.register_world(header.form_id, offset),
                b"CELL" => {
                    let world_id = stack
                        .iter()
                        .rev()
                        .find(|frame| frame.group_type == 1)
                        .map(|frame| frame.label);
                    self.register_cell(offset, world_id);
                }
                b"INFO" => self.index.info_records.push((header.form_id, offset)),
                _ => {}
            }
            offset += header.total_size();
        }
        self.phase1_end = offset;
    }

    /// Phase 2: after the TOFT marker the console appends cell-temporary
    /// groups and whole world-children groups without any enclosing
    /// structure. Records between them are duplicates and skipped.
    fn flat_scan(&mut self, stats: &mut Stats) {
        let mut offset = match self.index.first_toft {
            Some(toft) => self.phase1_end.max(toft),
            None => return,
        };
        while offset + GROUP_HEADER_SIZE <= self.input.len() {
            let sig = match signature_at(self.input, offset) {
                Some(sig) => sig,
                None => break,
            };
            if sig == *b"GRUP" {
                let header = match group_header_at(self.input, offset) {
                    Some(header) => header,
                    None => break,
                };
                let size = header.size as usize;
                if size < GROUP_HEADER_SIZE || offset + size > self.input.len() {
                    stats.resyncs += 1;
                    match find_group_signature(self.input, offset + 1) {
                        Some(next) => {
                            offset = next;
                            continue;
                        }
                        None => break,
                    }
                }
                self.register_group(offset, &header);
                if header.group_type == 1 {
                    debug!(
                        "flat world-children group for {:08X} at {:#x}",
                        header.label_form_id(),
                        offset
                    );
                    self.flat_world_children(offset + GROUP_HEADER_SIZE, offset + size, header.label_form_id());
                }
                offset += size;
                continue;
            }
            if !is_valid_signature(&sig) {
                match find_group_signature(self.input, offset + 1) {
                    Some(next) => {
                        offset = next;
                        continue;
                    }
                    None => break,
                }
            }
            match record_header_at(self.input, offset) {
                Some(header) if offset + header.total_size() <= self.input.len() => {
                    offset += header.total_size();
                }
                _ => match find_group_signature(self.input, offset + 1) {
                    Some(next) => offset = next,
                    None => break,
                },
            }
        }
    }

    /// Recursive part of phase 2: pull every exterior CELL out of a flat
    /// world-children group, nested sub-groups included.
    fn flat_world_children(&mut self, start: usize, end: usize, world_id: u32) {
        let end = end.min(self.input.len());
        let mut offset = start;
        while offset + RECORD_HEADER_SIZE <= end {
            let sig = match signature_at(self.input, offset) {
                Some(sig) => sig,
                None => return,
            };
            if sig == *b"GRUP" {
                let header = match group_header_at(self.input, offset) {
                    Some(header) => header,
                    None => return,
                };
                let size = header.size as usize;
                if size < GROUP_HEADER_SIZE || offset + size > end {
                    return;
                }
                self.register_group(offset, &header);
                offset += GROUP_HEADER_SIZE;
                continue;
            }
            let header = match record_header_at(self.input, offset) {
                Some(header) => header,
                None => return,
            };
            if offset + header.total_size() > end {
                return;
            }
            if sig == *b"CELL" {
                self.register_cell(offset, Some(world_id));
            }
            offset += header.total_size();
        }
    }

    /// Phase 3: sweep the whole file for GRUP signatures; cell-children
    /// groups embedded in arbitrary regions are accepted if their size is
    /// in range, deduplicated by offset.
    fn comprehensive_scan(&mut self) {
        let mut offset = 0;
        while let Some(found) = find_group_signature(self.input, offset) {
            if let Some(header) = group_header_at(self.input, found) {
                let size = header.size as usize;
                if (8..=10).contains(&header.group_type)
                    && size >= GROUP_HEADER_SIZE
                    && found + size <= self.input.len()
                {
                    self.register_group(found, &header);
                }
            }
            offset = found + 1;
        }
    }

    /// Last-resort sweeps for files whose structure defeated the scans.
    ///
    /// A sweep hit is only a candidate: group labels and record payloads
    /// spell these signatures too, so a hit must also parse as a sane
    /// record header. An empty or absurd data size rejects it (a real
    /// WRLD or CELL always carries subrecords, and a top-level group
    /// label is followed by a zero group-type word).
    fn fallbacks(&mut self) {
        if self.index.worlds.is_empty() {
            let mut offset = 0;
            while let Some(found) = find_signature(self.input, b"WRLD", offset) {
                if let Some(header) = record_header_at(self.input, found) {
                    if plausible_record(self.input, found, &header) {
                        self.register_world(header.form_id, found);
                    }
                }
                offset = found + 1;
            }
        }
        if self.index.cells.len() < MIN_EXPECTED_CELLS {
            let mut offset = 0;
            while let Some(found) = find_signature(self.input, b"CELL", offset) {
                if let Some(header) = record_header_at(self.input, found) {
                    if plausible_record(self.input, found, &header) {
                        self.register_cell(found, None);
                    }
                }
                offset = found + 1;
            }
        }
    }

    fn register_group(&mut self, offset: usize, header: &crate::bytes::GroupHeader) {
        if !(8..=10).contains(&header.group_type) {
            return;
        }
        if !self.seen_group_offsets.insert(offset) {
            return;
        }
        let key = (header.label_form_id(), header.group_type);
        self.index.cell_children.entry(key).or_default().push(GrupEntry {
            group_type: header.group_type,
            offset,
            size: header.size as usize,
        });
    }

    fn register_world(&mut self, form_id: u32, offset: usize) {
        if self.index.worlds.iter().any(|w| w.form_id == form_id) {
            return;
        }
        let name = record_subrecords(self.input, offset).and_then(|subs| {
            subs.iter().find(|s| s.sig == *b"EDID").map(|s| {
                let bytes = s.data.split(|b| *b == 0).next().unwrap_or(&s.data);
                let (name, _, _) = WINDOWS_1252.decode(bytes);
                name.into_owned()
            })
        });
        debug!(
            "world {:08X} ({}) at {:#x}",
            form_id,
            name.as_deref().unwrap_or("?"),
            offset
        );
        self.index.worlds.push(WorldEntry {
            form_id,
            offset,
            name,
        });
    }

    fn register_cell(&mut self, offset: usize, world_id: Option<u32>) {
        let header = match record_header_at(self.input, offset) {
            Some(header) => header,
            None => return,
        };
        if let Some(entry) = self.index.cells.get_mut(&header.form_id) {
            // First sighting wins; patch in a world if it was unknown.
            if let Some(world_id) = world_id {
                if entry.world_id.is_none() && entry.is_exterior {
                    entry.world_id = Some(world_id);
                }
            }
            return;
        }
        let grid = record_subrecords(self.input, offset).and_then(|subs| {
            subs.iter()
                .find(|s| s.sig == *b"XCLC" && s.data.len() >= 8)
                .map(|s| {
                    let x = sign_extend(u32::from_be_bytes([
                        s.data[0], s.data[1], s.data[2], s.data[3],
                    ]));
                    let y = sign_extend(u32::from_be_bytes([
                        s.data[4], s.data[5], s.data[6], s.data[7],
                    ]));
                    (x, y)
                })
        });
        self.index.cells.insert(
            header.form_id,
            CellEntry {
                form_id: header.form_id,
                offset,
                is_exterior: grid.is_some(),
                grid,
                world_id: if grid.is_some() { world_id } else { None },
            },
        );
    }

    /// Buckets every indexed cell into its world's exterior list or the
    /// interior list, applying the default-world fallback for exterior
    /// cells the scans could not attribute.
    fn finalize(mut self, stats: &mut Stats) -> ConversionIndex {
        let default_world = self.index.worlds.first().map(|w| w.form_id);
        let mut form_ids: Vec<u32> = self.index.cells.keys().copied().collect();
        form_ids.sort_unstable();
        for form_id in form_ids {
            let (is_exterior, world_id) = match self.index.cells.get_mut(&form_id) {
                Some(entry) => {
                    if entry.is_exterior && entry.world_id.is_none() {
                        entry.world_id = default_world;
                    }
                    (entry.is_exterior, entry.world_id)
                }
                None => continue,
            };
            match world_id {
                Some(world_id) if is_exterior => self
                    .index
                    .world_cells
                    .entry(world_id)
                    .or_default()
                    .push(form_id),
                _ => self.index.interior_cells.push(form_id),
            }
        }
        stats.worlds_indexed = self.index.worlds.len() as u64;
        stats.cells_indexed = self.index.cells.len() as u64;
        debug!(
            "index: {} worlds, {} cells ({} interior), {} cell-children groups",
            self.index.worlds.len(),
            self.index.cells.len(),
            self.index.interior_cells.len(),
            self.index.cell_children.values().map(Vec::len).sum::<usize>()
        );
        self.index
    }
}

const MAX_PLAUSIBLE_RECORD_DATA: u32 = 0x0010_0000;

fn plausible_record(input: &[u8], offset: usize, header: &crate::bytes::RecordHeader) -> bool {
    header.data_size as usize >= crate::bytes::FIELD_HEADER_SIZE
        && header.data_size < MAX_PLAUSIBLE_RECORD_DATA
        && header.form_id != 0
        && offset + header.total_size() <= input.len()
}

/// Subrecords of the record at `offset`, inflated if needed. `None` when
/// the record cannot be read; indexing treats that as "no metadata".
fn record_subrecords(input: &[u8], offset: usize) -> Option<Vec<crate::info_merge::Subrecord>> {
    let header = record_header_at(input, offset)?;
    let start = offset + RECORD_HEADER_SIZE;
    let data = input.get(start..start + header.data_size as usize)?;
    if header.is_compressed() {
        let (_, inflated) = compression::decompress_record_data(data).ok()?;
        Some(split_subrecords(&inflated, true))
    } else {
        Some(split_subrecords(data, true))
    }
}

/// Next offset at which an on-disk (byte-reversed) GRUP signature starts.
pub(crate) fn find_group_signature(input: &[u8], from: usize) -> Option<usize> {
    find_signature(input, b"GRUP", from)
}

fn find_signature(input: &[u8], canonical: &[u8; 4], from: usize) -> Option<usize> {
    if from >= input.len() {
        return None;
    }
    let reversed = [canonical[3], canonical[2], canonical[1], canonical[0]];
    input[from..]
        .windows(4)
        .position(|window| window == reversed)
        .map(|position| from + position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_search_uses_disk_order() {
        let mut data = vec![0u8; 8];
        data.extend_from_slice(b"PURG"); // GRUP reversed
        data.extend_from_slice(&[0u8; 4]);
        assert_eq!(find_group_signature(&data, 0), Some(8));
        assert_eq!(find_group_signature(&data, 9), None);
        assert_eq!(find_signature(&data, b"CELL", 0), None);
    }
}
