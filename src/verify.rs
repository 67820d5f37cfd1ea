//! Structural verification of converted output.
//!
//! Re-walks a finished conversion checking the invariants the PC loader
//! relies on: every GRUP size brackets its contents exactly, every
//! compressed payload's size prefix matches its inflated length, every
//! signature is well formed, and every uncompressed worldspace OFST table
//! agrees with its map bounds.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::bytes::{
    is_valid_signature, read_le_u32, sig_display, RecordFlags, GROUP_HEADER_SIZE,
    RECORD_HEADER_SIZE,
};
use crate::ofst::{grid_coord, scan_wrld_fields};

/// Findings of a verification pass. An empty `errors` list means every
/// checked invariant held.
#[derive(Debug, Default)]
pub struct VerifyReport {
    pub errors: Vec<String>,
    pub groups_checked: u64,
    pub records_checked: u64,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Walks a converted (little-endian) plugin and reports every violated
/// invariant. Never panics on malformed input; defects become entries in
/// the report.
pub fn verify(output: &[u8]) -> VerifyReport {
    let mut report = VerifyReport::default();
    let mut stack: Vec<usize> = Vec::new();
    let mut offset = 0;
    while offset + 4 <= output.len() {
        while let Some(&end) = stack.last() {
            if offset < end {
                break;
            }
            if offset > end {
                report.errors.push(format!(
                    "group ending at {:#x} overrun by contents reaching {:#x}",
                    end, offset
                ));
            }
            stack.pop();
        }
        let sig = [
            output[offset],
            output[offset + 1],
            output[offset + 2],
            output[offset + 3],
        ];
        if sig == *b"GRUP" {
            if offset + GROUP_HEADER_SIZE > output.len() {
                report
                    .errors
                    .push(format!("truncated GRUP header at {:#x}", offset));
                break;
            }
            let size = read_le_u32(output, offset + 4) as usize;
            let enclosing_end = stack.last().copied().unwrap_or(output.len());
            if size < GROUP_HEADER_SIZE || offset + size > enclosing_end {
                report.errors.push(format!(
                    "GRUP at {:#x} declares {} bytes, exceeding its container",
                    offset, size
                ));
                break;
            }
            report.groups_checked += 1;
            stack.push(offset + size);
            offset += GROUP_HEADER_SIZE;
            continue;
        }
        if !is_valid_signature(&sig) {
            report.errors.push(format!(
                "invalid record signature {:?} at {:#x}",
                sig_display(sig),
                offset
            ));
            break;
        }
        if offset + RECORD_HEADER_SIZE > output.len() {
            report
                .errors
                .push(format!("truncated record header at {:#x}", offset));
            break;
        }
        let data_size = read_le_u32(output, offset + 4) as usize;
        let end = offset + RECORD_HEADER_SIZE + data_size;
        if end > output.len() {
            report.errors.push(format!(
                "record {} at {:#x} runs past end of file",
                sig_display(sig),
                offset
            ));
            break;
        }
        report.records_checked += 1;
        let flags = RecordFlags::from_bits_truncate(read_le_u32(output, offset + 8));
        let data = &output[offset + RECORD_HEADER_SIZE..end];
        if flags.contains(RecordFlags::COMPRESSED) {
            check_compressed_prefix(sig, offset, data, &mut report);
        } else if sig == *b"WRLD" {
            check_ofst_dimensions(offset, data, &mut report);
        }
        offset = end;
    }
    for end in stack {
        if end != offset {
            report.errors.push(format!(
                "group ending at {:#x} left open at {:#x}",
                end, offset
            ));
        }
    }
    report
}

fn check_compressed_prefix(sig: [u8; 4], offset: usize, data: &[u8], report: &mut VerifyReport) {
    if data.len() < 4 {
        report.errors.push(format!(
            "compressed {} at {:#x} shorter than its size prefix",
            sig_display(sig),
            offset
        ));
        return;
    }
    let declared = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let mut inflated = Vec::with_capacity(declared);
    match ZlibDecoder::new(&data[4..]).read_to_end(&mut inflated) {
        Ok(_) if inflated.len() == declared => {}
        Ok(_) => report.errors.push(format!(
            "compressed {} at {:#x}: prefix says {} bytes, stream inflates to {}",
            sig_display(sig),
            offset,
            declared,
            inflated.len()
        )),
        Err(err) => report.errors.push(format!(
            "compressed {} at {:#x} does not inflate: {}",
            sig_display(sig),
            offset,
            err
        )),
    }
}

fn check_ofst_dimensions(offset: usize, data: &[u8], report: &mut VerifyReport) {
    let fields = scan_wrld_fields(data, 0, data.len());
    let (ofst_start, ofst_end) = match fields.ofst {
        Some(range) => range,
        None => return,
    };
    let (nam0, nam9) = match (fields.nam0, fields.nam9) {
        (Some(nam0), Some(nam9)) => (nam0, nam9),
        _ => return,
    };
    let columns = (grid_coord(nam9.0) - grid_coord(nam0.0) + 1).max(0) as usize;
    let rows = (grid_coord(nam9.1) - grid_coord(nam0.1) + 1).max(0) as usize;
    if columns == 0 || rows == 0 {
        return;
    }
    let entry_count = (ofst_end - ofst_start) / 4;
    let consistent = entry_count == columns * rows
        || entry_count % columns == 0
        || entry_count % rows == 0;
    if !consistent {
        report.errors.push(format!(
            "WRLD at {:#x}: OFST holds {} entries, bounds give {}x{}",
            offset, entry_count, columns, rows
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_group() {
        let mut data = Vec::new();
        data.extend_from_slice(b"GRUP");
        data.extend_from_slice(&(24u32 + 24).to_le_bytes());
        data.extend_from_slice(b"GMST");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        // One empty GMST record inside.
        data.extend_from_slice(b"GMST");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        let report = verify(&data);
        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(report.groups_checked, 1);
        assert_eq!(report.records_checked, 1);
    }

    #[test]
    fn rejects_wrong_group_size() {
        let mut data = Vec::new();
        data.extend_from_slice(b"GRUP");
        data.extend_from_slice(&30u32.to_le_bytes()); // does not bracket the record
        data.extend_from_slice(b"GMST");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(b"GMST");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        let report = verify(&data);
        assert!(!report.is_ok());
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = Vec::new();
        data.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        data.extend_from_slice(&[0u8; 20]);
        let report = verify(&data);
        assert!(!report.is_ok());
    }

    #[test]
    fn rejects_lying_compression_prefix() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[0xAB; 50]).unwrap();
        let stream = encoder.finish().unwrap();
        let mut payload = Vec::new();
        payload.extend_from_slice(&49u32.to_le_bytes()); // off by one
        payload.extend_from_slice(&stream);

        let mut data = Vec::new();
        data.extend_from_slice(b"NPC_");
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&0x00040000u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&payload);
        let report = verify(&data);
        assert!(!report.is_ok());
        assert!(report.errors[0].contains("prefix"));
    }
}
