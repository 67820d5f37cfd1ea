//! GRUP emission: header/fix-up primitives, the synthesized PC interior
//! and worldspace hierarchies, and the range walker that converts the
//! scattered cell-children groups.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::bytes::{
    floor_div, group_header_at, reverse_sig, signature_at, GROUP_HEADER_SIZE,
};
use crate::convert::Converter;
use crate::error::Result;
use crate::index::GrupEntry;

/// Cells per exterior block along one axis.
const BLOCK_CELLS: i32 = 32;
/// Cells per exterior sub-block along one axis.
const SUB_BLOCK_CELLS: i32 = 8;

/// Packs two signed 16-bit grid coordinates into a type-4/5 group label,
/// x in the low word.
fn pack_grid_label(x: i32, y: i32) -> [u8; 4] {
    let packed = (x as u16 as u32) | ((y as u16 as u32) << 16);
    packed.to_le_bytes()
}

/// Converts an Xbox group label to PC byte order. Top-level labels are
/// byte-reversed signatures, grid labels are per-halfword swapped, and
/// everything else is a big-endian integer.
pub(crate) fn convert_group_label(group_type: u32, label: [u8; 4]) -> [u8; 4] {
    match group_type {
        0 => reverse_sig(label),
        4 | 5 => [label[1], label[0], label[3], label[2]],
        _ => [label[3], label[2], label[1], label[0]],
    }
}

impl<'a> Converter<'a> {
    /// Emits a GRUP header with a zeroed size field and returns its output
    /// position for [`finalize_group`](Self::finalize_group).
    pub(crate) fn write_group_header(
        &mut self,
        group_type: u32,
        label: [u8; 4],
        stamp: u32,
        unknown: u32,
    ) -> usize {
        let position = self.out.len();
        self.out.extend_from_slice(b"GRUP");
        self.out.extend_from_slice(&0u32.to_le_bytes());
        self.out.extend_from_slice(&label);
        self.out.extend_from_slice(&group_type.to_le_bytes());
        self.out.extend_from_slice(&stamp.to_le_bytes());
        self.out.extend_from_slice(&unknown.to_le_bytes());
        self.stats.groups_written += 1;
        position
    }

    /// Patches the group's size field now that its contents are written.
    pub(crate) fn finalize_group(&mut self, header_position: usize) {
        let size = (self.out.len() - header_position) as u32;
        self.out[header_position + 4..header_position + 8]
            .copy_from_slice(&size.to_le_bytes());
    }

    /// Synthesizes the top-level CELL group: interior cells bucketed into
    /// block/sub-block groups by FormID.
    pub(crate) fn rebuild_interior_groups(&mut self, stamp: u32) -> Result<()> {
        let mut blocks: BTreeMap<u32, BTreeMap<u32, Vec<u32>>> = BTreeMap::new();
        for form_id in self.index.interior_cells.clone() {
            let block = (form_id & 0xFFF) % 10;
            let sub_block = form_id % 10;
            blocks
                .entry(block)
                .or_default()
                .entry(sub_block)
                .or_default()
                .push(form_id);
        }
        debug!("rebuilding interior CELL group: {} blocks", blocks.len());
        let top = self.write_group_header(0, *b"CELL", stamp, 0);
        for (block, sub_blocks) in blocks {
            let block_pos = self.write_group_header(2, block.to_le_bytes(), stamp, 0);
            for (sub_block, mut cells) in sub_blocks {
                let sub_pos = self.write_group_header(3, sub_block.to_le_bytes(), stamp, 0);
                cells.sort_unstable();
                for form_id in cells {
                    self.write_cell_with_children(form_id)?;
                }
                self.finalize_group(sub_pos);
            }
            self.finalize_group(block_pos);
        }
        self.finalize_group(top);
        Ok(())
    }

    /// Synthesizes the top-level WRLD group: each worldspace record
    /// followed by its world-children tree.
    pub(crate) fn rebuild_world_groups(&mut self, stamp: u32) -> Result<()> {
        let top = self.write_group_header(0, *b"WRLD", stamp, 0);
        for world in self.index.worlds.clone() {
            debug!(
                "rebuilding worldspace {:08X} ({})",
                world.form_id,
                world.name.as_deref().unwrap_or("?")
            );
            if let Err(err) = self.write_record(world.offset) {
                warn!("worldspace record unreadable: {}", err);
                self.stats.resyncs += 1;
                continue;
            }
            self.write_world_children(world.form_id, stamp)?;
        }
        self.finalize_group(top);
        Ok(())
    }

    /// The exterior hierarchy of one world: blocks of 32 cells holding
    /// sub-blocks of 8, both ordered by (y, x), cells ordered by
    /// (y, x, FormID).
    fn write_world_children(&mut self, world_id: u32, stamp: u32) -> Result<()> {
        let cell_ids = match self.index.world_cells.get(&world_id) {
            Some(cells) if !cells.is_empty() => cells.clone(),
            _ => return Ok(()),
        };
        type SubBlocks = BTreeMap<(i32, i32), Vec<(i32, i32, u32)>>;
        let mut blocks: BTreeMap<(i32, i32), SubBlocks> = BTreeMap::new();
        for form_id in cell_ids {
            let (x, y) = match self.index.cells.get(&form_id).and_then(|c| c.grid) {
                Some(grid) => grid,
                None => continue,
            };
            let block = (floor_div(y, BLOCK_CELLS), floor_div(x, BLOCK_CELLS));
            let sub_block = (floor_div(y, SUB_BLOCK_CELLS), floor_div(x, SUB_BLOCK_CELLS));
            blocks
                .entry(block)
                .or_default()
                .entry(sub_block)
                .or_default()
                .push((y, x, form_id));
        }
        let world_pos = self.write_group_header(1, world_id.to_le_bytes(), stamp, 0);
        for ((block_y, block_x), sub_blocks) in blocks {
            let block_pos =
                self.write_group_header(4, pack_grid_label(block_x, block_y), stamp, 0);
            for ((sub_y, sub_x), mut cells) in sub_blocks {
                let sub_pos =
                    self.write_group_header(5, pack_grid_label(sub_x, sub_y), stamp, 0);
                cells.sort_unstable();
                for (_, _, form_id) in cells {
                    self.write_cell_with_children(form_id)?;
                }
                self.finalize_group(sub_pos);
            }
            self.finalize_group(block_pos);
        }
        self.finalize_group(world_pos);
        Ok(())
    }

    /// One cell record plus, when the index found any, its merged
    /// cell-children group: a type-6 wrapper holding one group per child
    /// type in 8, 9, 10 order, each the concatenation of every scattered
    /// source group's converted contents.
    pub(crate) fn write_cell_with_children(&mut self, form_id: u32) -> Result<()> {
        let entry = match self.index.cells.get(&form_id) {
            Some(entry) => entry.clone(),
            None => return Ok(()),
        };
        if let Err(err) = self.write_record(entry.offset) {
            warn!("cell {:08X} unreadable: {}", form_id, err);
            self.stats.resyncs += 1;
            return Ok(());
        }
        if !self.index.has_cell_children(form_id) {
            return Ok(());
        }
        let wrapper = self.write_group_header(6, form_id.to_le_bytes(), 0, 0);
        for group_type in 8..=10 {
            let mut entries: Vec<GrupEntry> = match self
                .index
                .cell_children
                .get(&(form_id, group_type))
            {
                Some(entries) => entries.clone(),
                None => continue,
            };
            entries.sort_unstable_by_key(|entry| entry.offset);
            debug_assert!(entries.iter().all(|entry| entry.group_type == group_type));
            let merged = self.write_group_header(group_type, form_id.to_le_bytes(), 0, 0);
            for source in entries {
                self.convert_range(
                    source.offset + GROUP_HEADER_SIZE,
                    source.offset + source.size,
                )?;
            }
            self.finalize_group(merged);
        }
        self.finalize_group(wrapper);
        Ok(())
    }

    /// Converts every record and nested group in an input byte range with
    /// the same rules as the main loop. Used for cell-children contents,
    /// where nesting is shallow enough for recursion.
    pub(crate) fn convert_range(&mut self, start: usize, end: usize) -> Result<()> {
        let end = end.min(self.input.len());
        let mut offset = start;
        while offset + GROUP_HEADER_SIZE <= end {
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
                if size < GROUP_HEADER_SIZE || offset + size > end {
                    self.stats.resyncs += 1;
                    break;
                }
                let label = convert_group_label(header.group_type, header.label);
                let position =
                    self.write_group_header(header.group_type, label, header.stamp, header.unknown);
                self.convert_range(offset + GROUP_HEADER_SIZE, offset + size)?;
                self.finalize_group(position);
                offset += size;
                continue;
            }
            match self.write_record(offset) {
                Ok(consumed) => offset += consumed,
                Err(err) => {
                    warn!("record at {:#x} unreadable: {}", offset, err);
                    self.stats.resyncs += 1;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Pops any groups whose input range the cursor has passed, patching
    /// their sizes.
    pub(crate) fn close_completed_groups(&mut self, input_offset: usize) {
        loop {
            match self.open_groups.last() {
                Some(open) if input_offset >= open.input_end => {
                    let header_position = open.header_position;
                    self.open_groups.pop();
                    self.finalize_group(header_position);
                }
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_label_packing() {
        assert_eq!(pack_grid_label(0, 0), [0, 0, 0, 0]);
        assert_eq!(pack_grid_label(1, 2), [1, 0, 2, 0]);
        // Negative coordinates are two's-complement 16-bit halves.
        assert_eq!(pack_grid_label(-1, -2), [0xFF, 0xFF, 0xFE, 0xFF]);
    }

    #[test]
    fn label_conversion() {
        assert_eq!(convert_group_label(0, *b"DLRW"), *b"WRLD");
        // FormID label: plain endian reversal.
        assert_eq!(
            convert_group_label(6, [0x00, 0x01, 0x02, 0x03]),
            [0x03, 0x02, 0x01, 0x00]
        );
        // Grid label: each 16-bit half swapped in place.
        assert_eq!(
            convert_group_label(4, [0x00, 0x01, 0xFF, 0xFE]),
            [0x01, 0x00, 0xFE, 0xFF]
        );
    }
}
