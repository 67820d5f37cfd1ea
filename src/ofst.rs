//! Post-pass regeneration of worldspace cell-offset tables.
//!
//! The OFST subrecord of a WRLD holds a 2D array of u32 offsets, relative
//! to the WRLD record, of every exterior cell, indexed row-major over the
//! NAM0/NAM9-derived grid bounds. The console table is useless on PC (it
//! reflects the streaming layout), so after the main pass each
//! uncompressed worldspace's table is rewritten in place, visiting grid
//! coordinates in the PC serpentine order.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::bytes::{read_le_u16, read_le_u32, RecordFlags, GROUP_HEADER_SIZE, RECORD_HEADER_SIZE};
use crate::cell_order::{self, GridBounds};
use crate::convert::Converter;

/// One game cell is 4096 units on a side.
const CELL_UNITS: f32 = 4096.0;

/// Map bounds beyond this magnitude (or NaN) are uninitialised junk.
const JUNK_FLOAT_THRESHOLD: f32 = 1e20;

#[derive(Default)]
pub(crate) struct WrldFields {
    /// Absolute byte range of the OFST data in the output buffer.
    pub ofst: Option<(usize, usize)>,
    pub nam0: Option<(f32, f32)>,
    pub nam9: Option<(f32, f32)>,
}

pub(crate) fn grid_coord(value: f32) -> i32 {
    if !value.is_finite() || value.abs() >= JUNK_FLOAT_THRESHOLD {
        return 0;
    }
    (value / CELL_UNITS).round() as i32
}

impl<'a> Converter<'a> {
    pub(crate) fn rebuild_ofst_tables(&mut self) {
        for (world_id, position) in self.world_positions.clone() {
            self.rebuild_world_ofst(world_id, position);
        }
    }

    fn rebuild_world_ofst(&mut self, world_id: u32, wrld_position: usize) {
        if wrld_position + RECORD_HEADER_SIZE > self.out.len() {
            return;
        }
        let data_size = read_le_u32(&self.out, wrld_position + 4) as usize;
        let flags = RecordFlags::from_bits_truncate(read_le_u32(&self.out, wrld_position + 8));
        if flags.contains(RecordFlags::COMPRESSED) {
            // The table was stripped with the rest of the compressed
            // payload; nothing to patch in place.
            return;
        }
        let data_start = wrld_position + RECORD_HEADER_SIZE;
        let data_end = (data_start + data_size).min(self.out.len());
        let fields = scan_wrld_fields(&self.out, data_start, data_end);
        let (ofst_start, ofst_end) = match fields.ofst {
            Some(range) => range,
            None => return,
        };
        let (min_x, min_y) = match fields.nam0 {
            Some((x, y)) => (grid_coord(x), grid_coord(y)),
            None => return,
        };
        let (max_x, max_y) = match fields.nam9 {
            Some((x, y)) => (grid_coord(x), grid_coord(y)),
            None => return,
        };
        if max_x < min_x || max_y < min_y {
            return;
        }
        let bounds = GridBounds {
            min_x,
            max_x,
            min_y,
            max_y,
        };
        let mut columns = bounds.columns();
        let mut rows = bounds.rows();
        let entry_count = (ofst_end - ofst_start) / 4;
        if entry_count == 0 {
            return;
        }
        if entry_count != columns * rows {
            // Shipped tables sometimes disagree with the map bounds; trust
            // whichever axis divides the stored entry count.
            if columns > 0 && entry_count % columns == 0 {
                rows = entry_count / columns;
            } else if rows > 0 && entry_count % rows == 0 {
                columns = entry_count / rows;
            } else {
                warn!(
                    "worldspace {:08X}: OFST holds {} entries, bounds say {}x{}; leaving it",
                    world_id, entry_count, columns, rows
                );
                return;
            }
        }

        let mut cells_by_grid: HashMap<(i32, i32), Vec<u32>> = HashMap::new();
        for form_id in self.resolve_world_cells(world_id) {
            if let Some(grid) = self.index.cells.get(&form_id).and_then(|cell| cell.grid) {
                cells_by_grid.entry(grid).or_default().push(form_id);
            }
        }
        for cell_ids in cells_by_grid.values_mut() {
            // Same-coordinate collisions resolve by lowest FormID first.
            cell_ids.sort_unstable();
        }

        let mut entries: Vec<Option<(u32, usize)>> = vec![None; entry_count];
        for (x, y) in cell_order::generate(bounds) {
            let cell_ids = match cells_by_grid.get(&(x, y)) {
                Some(cell_ids) => cell_ids,
                None => continue,
            };
            let column = (x - bounds.min_x) as usize;
            let row = (y - bounds.min_y) as usize;
            if column >= columns || row >= rows {
                continue;
            }
            let index = row * columns + column;
            for &form_id in cell_ids {
                let cell_position = match self.cell_positions.get(&form_id) {
                    Some(position) => *position,
                    None => continue,
                };
                if cell_position <= wrld_position {
                    continue;
                }
                let relative = cell_position - wrld_position;
                if relative > u32::MAX as usize {
                    continue;
                }
                let candidate = (relative as u32, cell_position);
                entries[index] = Some(match entries[index] {
                    None => candidate,
                    Some(existing) if candidate < existing => candidate,
                    Some(existing) => existing,
                });
            }
        }

        for (i, entry) in entries.iter().enumerate() {
            let value = entry.map(|(relative, _)| relative).unwrap_or(0);
            let at = ofst_start + i * 4;
            self.out[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        self.stats.ofst_tables_rebuilt += 1;
        debug!(
            "worldspace {:08X}: OFST rebuilt, {}x{} grid, {} cells placed",
            world_id,
            columns,
            rows,
            entries.iter().filter(|e| e.is_some()).count()
        );
    }

    /// Exterior cells belonging to `world_id`: the index's attribution
    /// unioned with a fresh rescan of the output, falling back to every
    /// exterior cell when both come up empty.
    fn resolve_world_cells(&self, world_id: u32) -> Vec<u32> {
        let mut cells: HashSet<u32> = self
            .index
            .world_cells
            .get(&world_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        cells.extend(scan_output_world_cells(&self.out, world_id));
        if cells.is_empty() {
            return self
                .index
                .cells
                .values()
                .filter(|cell| cell.is_exterior)
                .map(|cell| cell.form_id)
                .collect();
        }
        cells.into_iter().collect()
    }
}

/// Little-endian subrecord walk over a WRLD's converted data, picking out
/// the three fields the rebuilder needs.
pub(crate) fn scan_wrld_fields(out: &[u8], start: usize, end: usize) -> WrldFields {
    let mut fields = WrldFields::default();
    let mut offset = start;
    let mut pending: u32 = 0;
    while offset + 6 <= end {
        let sig = [out[offset], out[offset + 1], out[offset + 2], out[offset + 3]];
        let stored = read_le_u16(out, offset + 4);
        offset += 6;
        if sig == *b"XXXX" && stored == 4 && offset + 4 <= end {
            pending = read_le_u32(out, offset);
            offset += 4;
            continue;
        }
        let size = if stored == 0 && pending > 0 {
            let size = pending as usize;
            pending = 0;
            size
        } else {
            stored as usize
        };
        let data_end = (offset + size).min(end);
        match &sig {
            b"OFST" => fields.ofst = Some((offset, data_end)),
            b"NAM0" if data_end - offset >= 8 => {
                fields.nam0 = Some((
                    f32::from_le_bytes([out[offset], out[offset + 1], out[offset + 2], out[offset + 3]]),
                    f32::from_le_bytes([out[offset + 4], out[offset + 5], out[offset + 6], out[offset + 7]]),
                ));
            }
            b"NAM9" if data_end - offset >= 8 => {
                fields.nam9 = Some((
                    f32::from_le_bytes([out[offset], out[offset + 1], out[offset + 2], out[offset + 3]]),
                    f32::from_le_bytes([out[offset + 4], out[offset + 5], out[offset + 6], out[offset + 7]]),
                ));
            }
            _ => {}
        }
        offset = data_end;
    }
    fields
}

/// Walks the (little-endian) output pairing every CELL record with the
/// innermost world-children group containing it.
fn scan_output_world_cells(out: &[u8], world_id: u32) -> Vec<u32> {
    let mut cells = Vec::new();
    let mut stack: Vec<(usize, u32, u32)> = Vec::new(); // (end, type, label)
    let mut offset = 0;
    while offset + RECORD_HEADER_SIZE <= out.len() {
        while stack.last().map_or(false, |(end, _, _)| offset >= *end) {
            stack.pop();
        }
        let sig = [out[offset], out[offset + 1], out[offset + 2], out[offset + 3]];
        if sig == *b"GRUP" {
            let size = read_le_u32(out, offset + 4) as usize;
            if size < GROUP_HEADER_SIZE || offset + size > out.len() {
                break;
            }
            let label = read_le_u32(out, offset + 8);
            let group_type = read_le_u32(out, offset + 12);
            stack.push((offset + size, group_type, label));
            offset += GROUP_HEADER_SIZE;
            continue;
        }
        let data_size = read_le_u32(out, offset + 4) as usize;
        if offset + RECORD_HEADER_SIZE + data_size > out.len() {
            break;
        }
        if sig == *b"CELL" {
            let ancestor = stack
                .iter()
                .rev()
                .find(|(_, group_type, _)| *group_type == 1)
                .map(|(_, _, label)| *label);
            if ancestor == Some(world_id) {
                cells.push(read_le_u32(out, offset + 12));
            }
        }
        offset += RECORD_HEADER_SIZE + data_size;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_coord_rounding() {
        assert_eq!(grid_coord(-8192.0), -2);
        assert_eq!(grid_coord(8192.0), 2);
        assert_eq!(grid_coord(6000.0), 1);
        assert_eq!(grid_coord(0.0), 0);
        assert_eq!(grid_coord(f32::NAN), 0);
        assert_eq!(grid_coord(3.4e38), 0);
        assert_eq!(grid_coord(-1.0e21), 0);
    }

    #[test]
    fn wrld_field_scan() {
        let mut data = Vec::new();
        data.extend_from_slice(b"NAM0");
        data.extend_from_slice(&8u16.to_le_bytes());
        data.extend_from_slice(&(-8192.0f32).to_le_bytes());
        data.extend_from_slice(&(-8192.0f32).to_le_bytes());
        data.extend_from_slice(b"NAM9");
        data.extend_from_slice(&8u16.to_le_bytes());
        data.extend_from_slice(&8192.0f32.to_le_bytes());
        data.extend_from_slice(&8192.0f32.to_le_bytes());
        data.extend_from_slice(b"OFST");
        data.extend_from_slice(&100u16.to_le_bytes());
        data.extend_from_slice(&[0u8; 100]);
        let fields = scan_wrld_fields(&data, 0, data.len());
        assert_eq!(fields.nam0, Some((-8192.0, -8192.0)));
        assert_eq!(fields.nam9, Some((8192.0, 8192.0)));
        let (start, end) = fields.ofst.unwrap();
        assert_eq!(end - start, 100);
    }
}
