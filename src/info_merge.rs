//! Reassembly of split Xbox dialogue records.
//!
//! The console build stores most dialogue INFO records as two records
//! sharing one FormID: a *base* half carrying topic metadata, conditions,
//! choices and script source text, and a *response* half carrying the
//! spoken response groups and compiled script bytecode. PC expects a single
//! record with a fixed subrecord ordering, so the two halves are stitched
//! back together during conversion.

use std::collections::HashMap;

use log::{debug, warn};

use crate::bytes::{record_header_at, signature_at, RECORD_HEADER_SIZE};
use crate::compression;
use crate::processor;
use crate::stats::Stats;

const SCRIPT_SIGS: [&[u8; 4]; 8] = [
    b"SCHR", b"SCDA", b"SCTX", b"SLSD", b"SCVR", b"SCRV", b"SCRO", b"NEXT",
];

/// Subrecord signatures that mark the base half of a split pair.
const BASE_MARKERS: [&[u8; 4]; 6] = [b"DATA", b"QSTI", b"CTDA", b"CTDT", b"TCLT", b"PNAM"];

/// Subrecord signatures that mark the response half.
const RESPONSE_MARKERS: [&[u8; 4]; 3] = [b"TRDT", b"NAM1", b"NAM2"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Subrecord {
    pub sig: [u8; 4],
    pub data: Vec<u8>,
}

impl Subrecord {
    fn new(sig: [u8; 4], data: Vec<u8>) -> Self {
        Subrecord { sig, data }
    }
}

/// Splits raw record data into subrecords, resolving `XXXX` extended sizes.
/// `big_endian` selects the header byte order (input data is big-endian,
/// already-converted data is little-endian with canonical signatures).
pub(crate) fn split_subrecords(data: &[u8], big_endian: bool) -> Vec<Subrecord> {
    let mut subrecords = Vec::new();
    let mut offset = 0;
    let mut pending: Option<u32> = None;
    while offset + 6 <= data.len() {
        let sig = if big_endian {
            [
                data[offset + 3],
                data[offset + 2],
                data[offset + 1],
                data[offset],
            ]
        } else {
            [
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]
        };
        let stored_size = if big_endian {
            u16::from_be_bytes([data[offset + 4], data[offset + 5]])
        } else {
            u16::from_le_bytes([data[offset + 4], data[offset + 5]])
        };
        offset += 6;
        if sig == *b"XXXX" && stored_size == 4 && offset + 4 <= data.len() {
            let extended = if big_endian {
                u32::from_be_bytes([
                    data[offset],
                    data[offset + 1],
                    data[offset + 2],
                    data[offset + 3],
                ])
            } else {
                u32::from_le_bytes([
                    data[offset],
                    data[offset + 1],
                    data[offset + 2],
                    data[offset + 3],
                ])
            };
            pending = Some(extended);
            offset += 4;
            continue;
        }
        let size = if stored_size == 0 {
            pending.take().unwrap_or(0) as usize
        } else {
            stored_size as usize
        };
        let end = (offset + size).min(data.len());
        subrecords.push(Subrecord::new(sig, data[offset..end].to_vec()));
        offset = end;
    }
    subrecords
}

/// Serializes subrecords back into little-endian record data, synthesizing
/// an `XXXX` prefix for any payload too large for the 16-bit size field.
pub(crate) fn assemble_subrecords(subrecords: &[Subrecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for sub in subrecords {
        if sub.data.len() > u16::MAX as usize {
            out.extend_from_slice(b"XXXX");
            out.extend_from_slice(&4u16.to_le_bytes());
            out.extend_from_slice(&(sub.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&sub.sig);
            out.extend_from_slice(&0u16.to_le_bytes());
        } else {
            out.extend_from_slice(&sub.sig);
            out.extend_from_slice(&(sub.data.len() as u16).to_le_bytes());
        }
        out.extend_from_slice(&sub.data);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum InfoKind {
    Base,
    Response,
    Unknown,
}

fn classify(subrecords: &[Subrecord]) -> InfoKind {
    let has = |markers: &[&[u8; 4]]| {
        subrecords
            .iter()
            .any(|s| markers.iter().any(|m| **m == s.sig))
    };
    if has(&BASE_MARKERS) {
        InfoKind::Base
    } else if has(&RESPONSE_MARKERS) {
        InfoKind::Response
    } else {
        InfoKind::Unknown
    }
}

/// Outcome of consulting the merger for one INFO record offset.
pub(crate) enum MergeAction {
    /// Not part of a pair; convert normally.
    NotMerged,
    /// The second half of a pair already emitted; write nothing.
    Skip,
    /// Fully merged little-endian record data, ready to emit.
    Merged(Vec<u8>),
}

enum Role {
    Emit { base: usize, response: usize },
    Skip,
}

pub(crate) struct InfoMerger {
    roles: HashMap<usize, Role>,
}

impl InfoMerger {
    /// Scans the indexed INFO records once and pairs up split halves by
    /// FormID. At most one pair is produced per FormID; the base and
    /// response are picked by classification, ordered by source offset.
    pub(crate) fn build(input: &[u8], info_offsets: &[(u32, usize)]) -> InfoMerger {
        let mut by_form_id: HashMap<u32, Vec<usize>> = HashMap::new();
        for (form_id, offset) in info_offsets {
            by_form_id.entry(*form_id).or_default().push(*offset);
        }

        let mut roles = HashMap::new();
        for (form_id, mut offsets) in by_form_id {
            if offsets.len() < 2 {
                continue;
            }
            offsets.sort_unstable();
            let mut base = None;
            let mut response = None;
            for &offset in &offsets {
                let subrecords = match raw_subrecords(input, offset) {
                    Some(subrecords) => subrecords,
                    None => continue,
                };
                match classify(&subrecords) {
                    InfoKind::Base if base.is_none() => base = Some(offset),
                    InfoKind::Response if response.is_none() => response = Some(offset),
                    _ => {}
                }
            }
            if let (Some(base), Some(response)) = (base, response) {
                debug!(
                    "pairing INFO {:08X}: base at {:#x}, response at {:#x}",
                    form_id, base, response
                );
                let first = base.min(response);
                let second = base.max(response);
                roles.insert(first, Role::Emit { base, response });
                roles.insert(second, Role::Skip);
            }
        }
        InfoMerger { roles }
    }

    /// Called by the record writer for every INFO record it encounters.
    pub(crate) fn try_merge(&self, input: &[u8], offset: usize, stats: &mut Stats) -> MergeAction {
        match self.roles.get(&offset) {
            None => MergeAction::NotMerged,
            Some(Role::Skip) => MergeAction::Skip,
            Some(Role::Emit { base, response }) => {
                let base_subs = match converted_subrecords(input, *base, stats) {
                    Some(subs) => subs,
                    None => return MergeAction::NotMerged,
                };
                let response_subs = match converted_subrecords(input, *response, stats) {
                    Some(subs) => subs,
                    None => return MergeAction::NotMerged,
                };
                stats.info_pairs_merged += 1;
                let merged = merge_pair(&base_subs, &response_subs);
                MergeAction::Merged(assemble_subrecords(&merged))
            }
        }
    }
}

/// Raw (still big-endian) subrecords of the INFO record at `offset`,
/// inflating a compressed payload when necessary.
fn raw_subrecords(input: &[u8], offset: usize) -> Option<Vec<Subrecord>> {
    let header = record_header_at(input, offset)?;
    let start = offset + RECORD_HEADER_SIZE;
    let data = input.get(start..start + header.data_size as usize)?;
    if header.is_compressed() {
        match compression::decompress_record_data(data) {
            Ok((_, inflated)) => Some(split_subrecords(&inflated, true)),
            Err(err) => {
                warn!("INFO at {:#x} failed to inflate: {}", offset, err);
                None
            }
        }
    } else {
        Some(split_subrecords(data, true))
    }
}

/// Subrecords of the record at `offset` with every payload already
/// converted to PC byte order.
fn converted_subrecords(input: &[u8], offset: usize, stats: &mut Stats) -> Option<Vec<Subrecord>> {
    debug_assert_eq!(signature_at(input, offset), Some(*b"INFO"));
    let subrecords = raw_subrecords(input, offset)?;
    Some(
        subrecords
            .into_iter()
            .map(|sub| {
                let data = processor::convert_subrecord(sub.sig, *b"INFO", &sub.data, stats);
                Subrecord::new(sub.sig, data)
            })
            .collect(),
    )
}

fn is_script_sig(sig: [u8; 4]) -> bool {
    SCRIPT_SIGS.iter().any(|s| **s == sig)
}

/// Merges the converted subrecords of a base/response pair into the PC
/// canonical ordering.
fn merge_pair(base: &[Subrecord], response: &[Subrecord]) -> Vec<Subrecord> {
    let mut out: Vec<Subrecord> = Vec::new();
    let take = |sigs: &[&[u8; 4]], source: &[Subrecord]| -> Vec<Subrecord> {
        source
            .iter()
            .filter(|s| sigs.iter().any(|sig| **sig == s.sig))
            .cloned()
            .collect()
    };

    // 1. Base header.
    out.extend(take(&[b"DATA"], base));
    out.extend(take(&[b"QSTI"], base));
    // 2. Topic link.
    out.extend(take(&[b"NAME"], base));

    // 3. Response groups, one per TRDT, each closed by one base NAM3.
    let mut base_nam3: Vec<Subrecord> = take(&[b"NAM3"], base);
    let mut nam3_cursor = 0;
    let mut in_group = false;
    for sub in response {
        match &sub.sig {
            b"TRDT" => {
                if in_group && nam3_cursor < base_nam3.len() {
                    out.push(base_nam3[nam3_cursor].clone());
                    nam3_cursor += 1;
                }
                out.push(sub.clone());
                in_group = true;
            }
            b"NAM1" | b"NAM2" | b"NAM3" if in_group => out.push(sub.clone()),
            _ => {}
        }
    }
    if in_group && nam3_cursor < base_nam3.len() {
        out.push(base_nam3[nam3_cursor].clone());
        nam3_cursor += 1;
    }
    // 4. Base NAM3s that had no response group to close.
    out.extend(base_nam3.drain(nam3_cursor..));

    // 5. Conditions, 6. choices, 7. follow-ups.
    out.extend(take(&[b"CTDA", b"CTDT"], base));
    out.extend(take(&[b"TCLT", b"TCLF"], base));
    out.extend(take(&[b"TCFU"], base));

    // 8. Script blocks rebuilt from response bytecode and base source text.
    let base_sctx: Vec<Vec<u8>> = base
        .iter()
        .filter(|s| s.sig == *b"SCTX")
        .map(|s| s.data.clone())
        .collect();
    out.extend(build_script_blocks(response, base_sctx));

    // 9. Whatever else either half carries, base first, source order.
    let consumed_base: &[&[u8; 4]] = &[
        b"DATA", b"QSTI", b"NAME", b"NAM3", b"CTDA", b"CTDT", b"TCLT", b"TCLF", b"TCFU", b"SCTX",
        b"RNAM", b"ANAM", b"KNAM", b"DNAM",
    ];
    for sub in base {
        if !consumed_base.iter().any(|sig| **sig == sub.sig) && !is_script_sig(sub.sig) {
            out.push(sub.clone());
        }
    }
    let consumed_response: &[&[u8; 4]] = &[b"TRDT", b"NAM1", b"NAM2", b"NAM3"];
    for sub in response {
        if !consumed_response.iter().any(|sig| **sig == sub.sig) && !is_script_sig(sub.sig) {
            out.push(sub.clone());
        }
    }

    // 10. Trailing metadata.
    out.extend(take(&[b"RNAM"], base));
    out.extend(take(&[b"ANAM"], base));
    out.extend(take(&[b"KNAM"], base));
    out.extend(take(&[b"DNAM"], base));
    out
}

#[derive(Debug, Default)]
struct ScriptBlock {
    schr: Vec<u8>,
    scda: Vec<Subrecord>,
    locals: Vec<Subrecord>,
    scro: Vec<Subrecord>,
    sctx: Option<Vec<u8>>,
    has_next_after: bool,
}

impl ScriptBlock {
    /// Empty placeholder block: a zeroed SCHR with the enabled flag set.
    fn synthetic() -> ScriptBlock {
        let mut schr = vec![0u8; 20];
        schr[18..20].copy_from_slice(&1u16.to_le_bytes());
        ScriptBlock {
            schr,
            ..ScriptBlock::default()
        }
    }
}

/// Rebuilds the PC script block sequence
/// `SCHR → SCDA → SCTX → locals → SCRO → NEXT → …` from the response's
/// compiled scripts and the base's source text.
fn build_script_blocks(response: &[Subrecord], base_sctx: Vec<Vec<u8>>) -> Vec<Subrecord> {
    let mut blocks: Vec<ScriptBlock> = Vec::new();
    let mut leading_next = false;
    let mut trailing_next = false;
    let mut saw_next = false;
    for sub in response {
        match &sub.sig {
            b"SCHR" => {
                trailing_next = false;
                blocks.push(ScriptBlock {
                    schr: sub.data.clone(),
                    ..ScriptBlock::default()
                });
            }
            b"SCDA" => {
                if let Some(block) = blocks.last_mut() {
                    block.scda.push(sub.clone());
                }
            }
            b"SLSD" | b"SCVR" | b"SCRV" => {
                if let Some(block) = blocks.last_mut() {
                    block.locals.push(sub.clone());
                }
            }
            b"SCRO" => {
                if let Some(block) = blocks.last_mut() {
                    block.scro.push(sub.clone());
                }
            }
            b"NEXT" => {
                saw_next = true;
                trailing_next = true;
                match blocks.last_mut() {
                    Some(block) => block.has_next_after = true,
                    None => leading_next = true,
                }
            }
            _ => {}
        }
    }

    if blocks.is_empty() {
        if base_sctx.is_empty() && !saw_next {
            return Vec::new();
        }
        // A script existed on the console side even though no bytecode
        // survived; synthesize the Begin/End pair PC expects.
        let mut begin = ScriptBlock::synthetic();
        begin.has_next_after = true;
        blocks.push(begin);
        blocks.push(ScriptBlock::synthetic());
    } else {
        if leading_next {
            let mut begin = ScriptBlock::synthetic();
            begin.has_next_after = true;
            blocks.insert(0, begin);
        }
        if trailing_next {
            blocks.push(ScriptBlock::synthetic());
        }
    }

    assign_sctx(&mut blocks, &base_sctx);

    let block_count = blocks.len();
    let mut out = Vec::new();
    for (i, block) in blocks.into_iter().enumerate() {
        out.push(Subrecord::new(*b"SCHR", block.schr));
        out.extend(block.scda);
        if let Some(sctx) = block.sctx {
            out.push(Subrecord::new(*b"SCTX", sctx));
        }
        out.extend(block.locals);
        out.extend(block.scro);
        if block.has_next_after && i + 1 < block_count {
            out.push(Subrecord::new(*b"NEXT", Vec::new()));
        }
    }
    // Source text with no block to live in is still preserved.
    for sctx in base_sctx.into_iter().skip(block_count) {
        out.push(Subrecord::new(*b"SCTX", sctx));
    }
    out
}

/// Distributes base SCTX entries over the script blocks. With enough
/// entries the assignment is positional; when short, blocks that carry
/// bytecode are served first.
fn assign_sctx(blocks: &mut [ScriptBlock], base_sctx: &[Vec<u8>]) {
    if base_sctx.len() >= blocks.len() {
        for (block, sctx) in blocks.iter_mut().zip(base_sctx) {
            block.sctx = Some(sctx.clone());
        }
        return;
    }
    let mut queue = base_sctx.iter();
    for block in blocks.iter_mut().filter(|b| !b.scda.is_empty()) {
        match queue.next() {
            Some(sctx) => block.sctx = Some(sctx.clone()),
            None => return,
        }
    }
    for block in blocks.iter_mut().filter(|b| b.sctx.is_none()) {
        match queue.next() {
            Some(sctx) => block.sctx = Some(sctx.clone()),
            None => return,
        }
    }
}

/// Cleanup pass for INFO records that were not merged: orphaned NAM3
/// subrecords are dropped, and a record with no script header or bytecode
/// sheds all script subrecords. Operates on already-converted data.
pub(crate) fn reorder_info_subrecords(data: &[u8], stats: &mut Stats) -> Vec<u8> {
    let subrecords = split_subrecords(data, false);
    let has_script = subrecords
        .iter()
        .any(|s| s.sig == *b"SCHR" || s.sig == *b"SCDA");
    let mut seen_trdt = false;
    let mut kept = Vec::with_capacity(subrecords.len());
    let mut dropped = 0usize;
    for sub in subrecords {
        if sub.sig == *b"TRDT" {
            seen_trdt = true;
        }
        if sub.sig == *b"NAM3" && !seen_trdt {
            dropped += 1;
            continue;
        }
        if !has_script && is_script_sig(sub.sig) {
            dropped += 1;
            continue;
        }
        kept.push(sub);
    }
    if dropped > 0 {
        stats.info_records_reordered += 1;
        assemble_subrecords(&kept)
    } else {
        data.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(sig: &[u8; 4], data: &[u8]) -> Subrecord {
        Subrecord::new(*sig, data.to_vec())
    }

    fn sigs(subrecords: &[Subrecord]) -> Vec<String> {
        subrecords
            .iter()
            .map(|s| String::from_utf8_lossy(&s.sig).into_owned())
            .collect()
    }

    #[test]
    fn split_resolves_extended_sizes() {
        let mut data = Vec::new();
        data.extend_from_slice(b"XXXX");
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&70000u32.to_le_bytes());
        data.extend_from_slice(b"SCDA");
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&vec![0xAB; 70000]);
        let subs = split_subrecords(&data, false);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].sig, *b"SCDA");
        assert_eq!(subs[0].data.len(), 70000);
    }

    #[test]
    fn assemble_resynthesizes_extended_sizes() {
        let subs = vec![sub(b"SCDA", &vec![0xCD; 70000])];
        let data = assemble_subrecords(&subs);
        assert_eq!(&data[0..4], b"XXXX");
        let round = split_subrecords(&data, false);
        assert_eq!(round, subs);
    }

    #[test]
    fn classification() {
        assert_eq!(
            classify(&[sub(b"DATA", &[0; 4]), sub(b"QSTI", &[0; 4])]),
            InfoKind::Base
        );
        assert_eq!(
            classify(&[sub(b"TRDT", &[0; 24]), sub(b"NAM1", b"hi\0")]),
            InfoKind::Response
        );
        // Base markers dominate.
        assert_eq!(
            classify(&[sub(b"TRDT", &[0; 24]), sub(b"DATA", &[0; 4])]),
            InfoKind::Base
        );
        assert_eq!(classify(&[sub(b"EDID", b"x\0")]), InfoKind::Unknown);
    }

    #[test]
    fn merge_matches_pc_ordering() {
        // The canonical split-pair scenario: two responses, two scripts.
        let base = vec![
            sub(b"DATA", &[0; 4]),
            sub(b"QSTI", &[1; 4]),
            sub(b"TCLT", &[2; 4]),
            sub(b"NAM3", b"edit one\0"),
            sub(b"NAM3", b"edit two\0"),
            sub(b"CTDA", &[0; 28]),
            sub(b"SCTX", b"Begin\0"),
            sub(b"SCTX", b"End\0"),
        ];
        let response = vec![
            sub(b"TRDT", &[0; 24]),
            sub(b"NAM1", b"first\0"),
            sub(b"TRDT", &[1; 24]),
            sub(b"NAM1", b"second\0"),
            sub(b"SCHR", &[0; 20]),
            sub(b"SCDA", &[9; 6]),
            sub(b"NEXT", &[]),
            sub(b"SCHR", &[0; 20]),
            sub(b"SCDA", &[8; 6]),
        ];
        let merged = merge_pair(&base, &response);
        assert_eq!(
            sigs(&merged),
            vec![
                "DATA", "QSTI", "TRDT", "NAM1", "NAM3", "TRDT", "NAM1", "NAM3", "CTDA", "TCLT",
                "SCHR", "SCDA", "SCTX", "NEXT", "SCHR", "SCDA", "SCTX",
            ]
        );
        // Source text lands in stream order: Begin first, End second.
        let sctx: Vec<&[u8]> = merged
            .iter()
            .filter(|s| s.sig == *b"SCTX")
            .map(|s| s.data.as_slice())
            .collect();
        assert_eq!(sctx, vec![b"Begin\0".as_ref(), b"End\0".as_ref()]);
    }

    #[test]
    fn merge_keeps_unconsumed_base_nam3() {
        let base = vec![
            sub(b"DATA", &[0; 4]),
            sub(b"NAM3", b"a\0"),
            sub(b"NAM3", b"b\0"),
            sub(b"NAM3", b"c\0"),
        ];
        let response = vec![sub(b"TRDT", &[0; 24])];
        let merged = merge_pair(&base, &response);
        assert_eq!(sigs(&merged), vec!["DATA", "TRDT", "NAM3", "NAM3", "NAM3"]);
    }

    #[test]
    fn leading_next_synthesizes_begin_block() {
        let response = vec![
            sub(b"NEXT", &[]),
            sub(b"SCHR", &[7; 20]),
            sub(b"SCDA", &[9; 4]),
        ];
        let blocks = build_script_blocks(&response, vec![b"End\0".to_vec()]);
        assert_eq!(sigs(&blocks), vec!["SCHR", "NEXT", "SCHR", "SCDA", "SCTX"]);
        // The synthetic block is empty except for the enabled flag.
        assert_eq!(blocks[0].data[18..20], [1, 0]);
        assert!(blocks[0].data[..18].iter().all(|b| *b == 0));
        // The one source text goes to the block with bytecode.
        assert_eq!(blocks[4].data, b"End\0".to_vec());
    }

    #[test]
    fn trailing_next_synthesizes_end_block() {
        let response = vec![
            sub(b"SCHR", &[7; 20]),
            sub(b"SCDA", &[9; 4]),
            sub(b"NEXT", &[]),
        ];
        let blocks = build_script_blocks(&response, Vec::new());
        assert_eq!(sigs(&blocks), vec!["SCHR", "SCDA", "NEXT", "SCHR"]);
    }

    #[test]
    fn sctx_without_bytecode_synthesizes_pair() {
        let blocks = build_script_blocks(&[], vec![b"Begin\0".to_vec(), b"End\0".to_vec()]);
        assert_eq!(sigs(&blocks), vec!["SCHR", "SCTX", "NEXT", "SCHR", "SCTX"]);
    }

    #[test]
    fn scro_follows_sctx_within_block() {
        let response = vec![
            sub(b"SCHR", &[0; 20]),
            sub(b"SCDA", &[1; 4]),
            sub(b"SCRO", &[2; 4]),
            sub(b"SCRO", &[3; 4]),
        ];
        let blocks = build_script_blocks(&response, vec![b"src\0".to_vec()]);
        assert_eq!(sigs(&blocks), vec!["SCHR", "SCDA", "SCTX", "SCRO", "SCRO"]);
    }

    #[test]
    fn reorder_strips_orphan_nam3() {
        let subs = vec![
            sub(b"DATA", &[0; 4]),
            sub(b"NAM3", b"orphan\0"),
            sub(b"TRDT", &[0; 24]),
            sub(b"NAM3", b"kept\0"),
        ];
        let data = assemble_subrecords(&subs);
        let mut stats = Stats::default();
        let out = reorder_info_subrecords(&data, &mut stats);
        let kept = split_subrecords(&out, false);
        assert_eq!(sigs(&kept), vec!["DATA", "TRDT", "NAM3"]);
        assert_eq!(stats.info_records_reordered, 1);
    }

    #[test]
    fn reorder_strips_scripts_without_header() {
        let subs = vec![
            sub(b"DATA", &[0; 4]),
            sub(b"SCRO", &[1; 4]),
            sub(b"NEXT", &[]),
        ];
        let data = assemble_subrecords(&subs);
        let mut stats = Stats::default();
        let out = reorder_info_subrecords(&data, &mut stats);
        let kept = split_subrecords(&out, false);
        assert_eq!(sigs(&kept), vec!["DATA"]);
    }

    #[test]
    fn reorder_keeps_scripts_with_header() {
        let subs = vec![
            sub(b"DATA", &[0; 4]),
            sub(b"SCHR", &[0; 20]),
            sub(b"SCRO", &[1; 4]),
        ];
        let data = assemble_subrecords(&subs);
        let mut stats = Stats::default();
        let out = reorder_info_subrecords(&data, &mut stats);
        assert_eq!(out, data);
        assert_eq!(stats.info_records_reordered, 0);
    }
}
