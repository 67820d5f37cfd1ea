//! Declarative catalog mapping subrecords to their internal field layouts.
//!
//! Every entry answers one question: given a subrecord signature, the record
//! type that contains it, and the payload length, what sequence of typed
//! fields does the payload hold? The processor walks that sequence and
//! byte-swaps each field from the Xbox 360 big-endian layout to the PC
//! little-endian one.
//!
//! Lookup priority, most specific first:
//!
//! 1. IMAD records get a dedicated rule (almost everything inside them is a
//!    float array; `*IAD` keys are time/value float pairs).
//! 2. `(signature, record, length)`
//! 3. `(signature, record)`
//! 4. `(signature, length)`
//! 5. `(signature)`
//! 6. `DATA` length heuristic.
//! 7. WTHR `*IAD` keyed float pairs.
//!
//! The tables are immutable after construction and built once per process.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use self::FieldType::*;

/// Type of a single field inside a subrecord.
///
/// `FormIdLittleEndian`, `UInt16LittleEndian` and `UInt32WordSwapped` exist
/// because a handful of Xbox fields are already in PC byte order or use a
/// middle-endian u32 (two big-endian 16-bit halves stored in little-endian
/// order). Swapping those naively corrupts the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    FormId,
    Float,
    UInt64,
    Int64,
    Double,
    /// Three consecutive floats.
    Vec3,
    /// Four consecutive floats.
    Quaternion,
    /// Position plus rotation, six consecutive floats.
    PosRot,
    /// Four bytes already in PC channel order; passed through.
    ColorRgba,
    /// Xbox ARGB color rotated into PC RGBA.
    ColorArgb,
    ByteArray(usize),
    Padding(usize),
    /// 16-bit value the Xbox already stores little-endian.
    UInt16LittleEndian,
    /// FormID the Xbox already stores little-endian.
    FormIdLittleEndian,
    /// Middle-endian u32: each 16-bit half is byte-swapped in place.
    UInt32WordSwapped,
    /// Single byte overwritten with the PC-side constant.
    PlatformByte(u8),
}

impl FieldType {
    pub fn size(&self) -> usize {
        match *self {
            UInt8 | Int8 | PlatformByte(_) => 1,
            UInt16 | Int16 | UInt16LittleEndian => 2,
            UInt32 | Int32 | FormId | Float | FormIdLittleEndian | UInt32WordSwapped => 4,
            UInt64 | Int64 | Double => 8,
            Vec3 => 12,
            Quaternion => 16,
            PosRot => 24,
            ColorRgba | ColorArgb => 4,
            ByteArray(n) | Padding(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// Diagnostic name; never serialized.
    pub name: &'static str,
    pub ty: FieldType,
}

/// Layout of a subrecord payload.
#[derive(Debug, Clone, Copy)]
pub enum Layout {
    /// Null-terminated or raw ASCII; passed through unchanged.
    String,
    /// Opaque bytes; passed through unchanged.
    Bytes,
    /// The whole payload is consecutive big-endian FormIDs.
    FormIdArray,
    /// The whole payload is consecutive big-endian floats.
    FloatArray,
    /// A fixed field sequence applied once from offset zero.
    Fields(&'static [Field]),
    /// A field sequence repeated `len / element_size` times.
    Repeat(&'static [Field]),
}

impl Layout {
    /// Per-element size of a `Fields`/`Repeat` layout.
    pub fn element_size(&self) -> Option<usize> {
        match self {
            Layout::Fields(fields) | Layout::Repeat(fields) => {
                Some(fields.iter().map(|f| f.ty.size()).sum())
            }
            _ => None,
        }
    }
}

macro_rules! fields {
    ($($name:literal : $ty:expr),* $(,)?) => {
        Layout::Fields(&[$(Field { name: $name, ty: $ty }),*])
    };
}

macro_rules! repeat {
    ($($name:literal : $ty:expr),* $(,)?) => {
        Layout::Repeat(&[$(Field { name: $name, ty: $ty }),*])
    };
}

struct Entry {
    sig: [u8; 4],
    rec: Option<[u8; 4]>,
    len: Option<u16>,
    layout: Layout,
}

const fn any(sig: &[u8; 4], layout: Layout) -> Entry {
    Entry {
        sig: *sig,
        rec: None,
        len: None,
        layout,
    }
}

const fn by_rec(sig: &[u8; 4], rec: &[u8; 4], layout: Layout) -> Entry {
    Entry {
        sig: *sig,
        rec: Some(*rec),
        len: None,
        layout,
    }
}

const fn by_len(sig: &[u8; 4], len: u16, layout: Layout) -> Entry {
    Entry {
        sig: *sig,
        rec: None,
        len: Some(len),
        layout,
    }
}

const fn exact(sig: &[u8; 4], rec: &[u8; 4], len: u16, layout: Layout) -> Entry {
    Entry {
        sig: *sig,
        rec: Some(*rec),
        len: Some(len),
        layout,
    }
}

/// Time/value keyframe pair used by `*IAD` subrecords in IMAD and WTHR.
static IAD_KEY: &[Field] = &[
    Field {
        name: "time",
        ty: Float,
    },
    Field {
        name: "value",
        ty: Float,
    },
];

/// Null-terminated and raw-ASCII subrecords, passed through byte-for-byte.
/// A `(sig, rec)` pair restricts the entry to one record type; record-typed
/// entries take priority over the record-agnostic set.
static STRING_SUBRECORDS: &[([u8; 4], Option<[u8; 4]>)] = &[
    (*b"EDID", None),
    (*b"FULL", None),
    (*b"MODL", None),
    (*b"MOD2", None),
    (*b"MOD3", None),
    (*b"MOD4", None),
    (*b"ICON", None),
    (*b"MICO", None),
    (*b"ICO2", None),
    (*b"MIC2", None),
    (*b"DESC", None),
    (*b"SCVR", None),
    (*b"SCTX", None),
    (*b"DMDL", None),
    (*b"NIFZ", None),
    (*b"KFFZ", None),
    (*b"ITXT", None),
    (*b"RDMP", None),
    (*b"MAST", None),
    (*b"BPTN", None),
    (*b"BPNN", None),
    (*b"BPNT", None),
    (*b"BPNI", None),
    (*b"TX00", None),
    (*b"TX01", None),
    (*b"TX02", None),
    (*b"TX03", None),
    (*b"TX04", None),
    (*b"TX05", None),
    (*b"MWD1", None),
    (*b"MWD2", None),
    (*b"MWD3", None),
    (*b"MWD4", None),
    (*b"MWD5", None),
    (*b"MWD6", None),
    (*b"MWD7", None),
    (*b"CNAM", Some(*b"TES4")),
    (*b"SNAM", Some(*b"TES4")),
    (*b"RNAM", Some(*b"INFO")),
    (*b"NAM1", Some(*b"INFO")),
    (*b"NAM2", Some(*b"INFO")),
    (*b"NAM3", Some(*b"INFO")),
    (*b"ONAM", Some(*b"AMMO")),
    (*b"QNAM", Some(*b"AMMO")),
    (*b"TNAM", Some(*b"NOTE")),
    (*b"XNAM", Some(*b"NOTE")),
    (*b"SHRT", Some(*b"NPC_")),
    (*b"MNAM", Some(*b"FACT")),
    (*b"FNAM", Some(*b"FACT")),
    (*b"CNAM", Some(*b"QUST")),
    (*b"NNAM", Some(*b"QUST")),
    (*b"RNAM", Some(*b"TERM")),
    (*b"XNAM", Some(*b"CELL")),
    (*b"EPF2", Some(*b"PERK")),
    (*b"FNAM", Some(*b"MUSC")),
    (*b"FNAM", Some(*b"SOUN")),
    (*b"FNAM", Some(*b"CLMT")),
    (*b"GNAM", Some(*b"CLMT")),
    (*b"NNAM", Some(*b"WATR")),
    (*b"ANAM", Some(*b"AVIF")),
    (*b"NAM2", Some(*b"MSET")),
    (*b"NAM3", Some(*b"MSET")),
    (*b"NAM4", Some(*b"MSET")),
    (*b"NAM5", Some(*b"MSET")),
    (*b"NAM6", Some(*b"MSET")),
    (*b"NAM7", Some(*b"MSET")),
];

#[rustfmt::skip]
static SCHEMAS: &[Entry] = &[
    // -------------------------------------------------------------------
    // Shared subrecords
    // -------------------------------------------------------------------
    any(b"XXXX", fields!["size": UInt32]),
    any(b"OBND", fields![
        "x1": Int16, "y1": Int16, "z1": Int16,
        "x2": Int16, "y2": Int16, "z2": Int16,
    ]),
    any(b"CTDA", fields![
        "type": UInt8, "unused": Padding(3),
        "comparison_value": Float,
        "function": UInt16, "unused2": Padding(2),
        "param1": UInt32, "param2": UInt32,
        "run_on": UInt32, "reference": FormId,
    ]),
    any(b"CTDT", fields![
        "type": UInt8, "unused": Padding(3),
        "comparison_value": Float,
        "function": UInt16, "unused2": Padding(2),
        "param1": UInt32, "param2": UInt32,
    ]),
    any(b"SCHR", fields![
        "unused": Padding(4),
        "ref_count": UInt32, "compiled_size": UInt32, "variable_count": UInt32,
        "type": UInt16, "flags": UInt16,
    ]),
    any(b"SCDA", Layout::Bytes),
    any(b"SLSD", fields![
        "index": UInt32, "unused": Padding(12),
        "flags": UInt8, "unused2": Padding(7),
    ]),
    any(b"SCRO", fields!["reference": FormId]),
    any(b"SCRV", fields!["index": UInt32]),
    any(b"NEXT", Layout::Bytes),
    any(b"NAME", fields!["base": FormId]),
    any(b"SCRI", fields!["script": FormId]),
    any(b"EITM", fields!["effect": FormId]),
    any(b"EAMT", fields!["charge": UInt16]),
    any(b"ETYP", fields!["equipment_type": Int32]),
    any(b"BIPL", fields!["biped_model_list": FormId]),
    any(b"REPL", fields!["repair_list": FormId]),
    any(b"YNAM", fields!["pickup_sound": FormId]),
    any(b"ZNAM", fields!["drop_sound": FormId]),
    any(b"VTCK", fields!["voice_type": FormId]),
    any(b"TPLT", fields!["template": FormId]),
    any(b"WNAM", fields!["form": FormId]),
    any(b"EFID", fields!["base_effect": FormId]),
    any(b"EFIT", fields![
        "magnitude": UInt32, "area": UInt32, "duration": UInt32,
        "type": UInt32, "actor_value": Int32,
    ]),
    any(b"CNTO", fields!["item": FormId, "count": Int32]),
    any(b"COED", fields!["owner": FormId, "global": FormId, "condition": Float]),
    any(b"DEST", fields![
        "health": Int32, "count": UInt8, "flags": UInt8, "unused": Padding(2),
    ]),
    any(b"DSTD", fields![
        "health_percent": UInt8, "index": UInt8, "damage_stage": UInt8,
        "flags": UInt8, "self_damage_per_second": Int32,
        "explosion": FormId, "debris": FormId, "debris_count": Int32,
    ]),
    any(b"DODT", fields![
        "min_width": Float, "max_width": Float,
        "min_height": Float, "max_height": Float,
        "depth": Float, "shininess": Float,
        "parallax_scale": Float, "parallax_passes": UInt8,
        "flags": UInt8, "unused": Padding(2),
        "color": ColorArgb,
    ]),
    any(b"INTV", fields!["value": UInt32]),
    any(b"INCC", fields!["value": UInt32]),
    any(b"BMDT", fields![
        "biped_flags": UInt32, "general_flags": UInt8, "unused": Padding(3),
    ]),
    any(b"DELE", Layout::Bytes),
    // WRLD offset tables stay word-aligned for in-place patching.
    by_rec(b"OFST", b"WRLD", Layout::FormIdArray),
    any(b"OFST", Layout::Bytes),
    any(b"NVER", fields!["version": UInt32]),
    any(b"IDLF", fields!["flags": UInt8]),
    any(b"IDLC", fields!["count": UInt8]),
    any(b"IDLT", fields!["timer": Float]),
    any(b"IDLA", Layout::FormIdArray),
    any(b"LVLD", fields!["chance_none": UInt8]),
    any(b"LVLF", fields!["flags": UInt8]),
    any(b"LVLG", fields!["global": FormId]),
    any(b"LVLO", fields![
        "level": Int16, "unused": Padding(2),
        "reference": FormId,
        "count": Int16, "unused2": Padding(2),
    ]),
    any(b"QSTI", fields!["quest": FormId]),
    any(b"QSTR", fields!["quest": FormId]),
    any(b"PKID", fields!["package": FormId]),
    any(b"SPLO", fields!["spell": FormId]),
    any(b"ACBS", fields![
        "flags": UInt32, "fatigue": UInt16, "barter_gold": UInt16,
        "level": Int16, "calc_min": UInt16, "calc_max": UInt16,
        "speed_multiplier": UInt16, "karma": Float,
        "disposition": Int16, "template_flags": UInt16,
    ]),
    any(b"AIDT", fields![
        "aggression": UInt8, "confidence": UInt8, "energy": UInt8,
        "responsibility": UInt8, "mood": UInt8, "unused": Padding(3),
        "services": UInt32, "teaches": Int8, "max_training": UInt8,
        "unused2": Padding(2), "assistance": UInt32,
    ]),

    // -------------------------------------------------------------------
    // Placed reference subrecords (REFR / ACHR / ACRE / PGRE / PMIS)
    // -------------------------------------------------------------------
    by_rec(b"DATA", b"REFR", fields!["position_rotation": PosRot]),
    by_rec(b"DATA", b"ACHR", fields!["position_rotation": PosRot]),
    by_rec(b"DATA", b"ACRE", fields!["position_rotation": PosRot]),
    by_rec(b"DATA", b"PGRE", fields!["position_rotation": PosRot]),
    by_rec(b"DATA", b"PMIS", fields!["position_rotation": PosRot]),
    any(b"XSCL", fields!["scale": Float]),
    any(b"XOWN", fields!["owner": FormId]),
    any(b"XGLB", fields!["global": FormId]),
    any(b"XRNK", fields!["rank": Int32]),
    any(b"XCNT", fields!["count": Int32]),
    any(b"XRDS", fields!["radius": Float]),
    any(b"XHLP", fields!["health": Float]),
    any(b"XLCM", fields!["level_modifier": Int32]),
    any(b"XCHG", fields!["charge": Float]),
    any(b"XEZN", fields!["encounter_zone": FormId]),
    any(b"XLKR", Layout::FormIdArray),
    any(b"XMBR", fields!["multibound": FormId]),
    any(b"XLRM", fields!["linked_room": FormId]),
    any(b"XESP", fields!["parent": FormId, "flags": UInt32]),
    any(b"XTEL", fields!["door": FormId, "position_rotation": PosRot]),
    by_len(b"XLOC", 12, fields![
        "level": UInt8, "unused": Padding(3),
        "key": FormId, "flags": UInt8, "unused2": Padding(3),
    ]),
    by_len(b"XLOC", 20, fields![
        "level": UInt8, "unused": Padding(3),
        "key": FormId, "flags": UInt8, "unused2": Padding(3),
        "unused3": Padding(8),
    ]),
    any(b"XNDP", fields!["navmesh": FormId, "triangle": UInt16, "unused": Padding(2)]),
    any(b"XRDO", fields![
        "range_radius": Float, "broadcast_type": UInt32,
        "static_percentage": Float, "position_reference": FormId,
    ]),
    any(b"XAPD", fields!["flags": UInt8]),
    any(b"XAPR", fields!["reference": FormId, "delay": Float]),
    any(b"XAMT", fields!["ammo_type": FormId]),
    any(b"XAMC", fields!["ammo_count": Int32]),
    any(b"XPWR", repeat!["reference": FormId, "type": UInt32]),
    any(b"XDCR", fields!["reference": FormId, "unused": Padding(4)]),
    any(b"XPRD", fields!["idle_time": Float]),
    any(b"XPPA", Layout::Bytes),
    any(b"XACT", fields!["action_flags": UInt32]),
    any(b"XSED", Layout::Bytes),
    any(b"XRGD", Layout::Bytes),
    any(b"XRGB", Layout::Bytes),
    any(b"XPOD", fields!["room_a": FormId, "room_b": FormId]),

    // -------------------------------------------------------------------
    // TES4
    // -------------------------------------------------------------------
    by_rec(b"HEDR", b"TES4", fields![
        "version": Float, "record_count": UInt32, "next_object_id": UInt32,
    ]),
    by_rec(b"DATA", b"TES4", fields!["file_size": UInt64]),
    by_rec(b"ONAM", b"TES4", Layout::FormIdArray),
    by_rec(b"SCRN", b"TES4", Layout::Bytes),

    // -------------------------------------------------------------------
    // CELL
    // -------------------------------------------------------------------
    exact(b"XCLC", b"CELL", 8, fields!["x": Int32, "y": Int32]),
    exact(b"XCLC", b"CELL", 12, fields![
        "x": Int32, "y": Int32, "force_hide_land": UInt32,
    ]),
    by_rec(b"XCLL", b"CELL", fields![
        "ambient": ColorRgba, "directional": ColorRgba, "fog": ColorRgba,
        "fog_near": Float, "fog_far": Float,
        "rotation_xy": Int32, "rotation_z": Int32,
        "directional_fade": Float, "fog_clip": Float, "fog_power": Float,
    ]),
    any(b"XCLW", fields!["water_height": Float]),
    any(b"XCLR", Layout::FormIdArray),
    by_rec(b"LNAM", b"CELL", fields!["template_flags": UInt32]),
    any(b"LTMP", fields!["light_template": FormId]),
    any(b"XCWT", fields!["water": FormId]),
    any(b"XCAS", fields!["acoustic_space": FormId]),
    any(b"XCIM", fields!["image_space": FormId]),
    any(b"XCMO", fields!["music_type": FormId]),
    any(b"XCCM", fields!["climate": FormId]),
    any(b"XCET", Layout::Bytes),

    // -------------------------------------------------------------------
    // WRLD
    // -------------------------------------------------------------------
    by_rec(b"PNAM", b"WRLD", fields!["flags": UInt16]),
    by_rec(b"CNAM", b"WRLD", fields!["climate": FormId]),
    by_rec(b"NAM2", b"WRLD", fields!["water": FormId]),
    by_rec(b"NAM3", b"WRLD", fields!["lod_water_type": FormId]),
    by_rec(b"NAM4", b"WRLD", fields!["lod_water_height": Float]),
    by_rec(b"DNAM", b"WRLD", fields![
        "default_land_height": Float, "default_water_height": Float,
    ]),
    by_rec(b"MNAM", b"WRLD", fields![
        "usable_x": Int32, "usable_y": Int32,
        "nw_x": Int16, "nw_y": Int16, "se_x": Int16, "se_y": Int16,
    ]),
    by_rec(b"ONAM", b"WRLD", Layout::FloatArray),
    by_rec(b"NAM0", b"WRLD", fields!["min_x": Float, "min_y": Float]),
    by_rec(b"NAM9", b"WRLD", fields!["max_x": Float, "max_y": Float]),
    by_rec(b"ZNAM", b"WRLD", fields!["music_type": FormId]),
    by_rec(b"INAM", b"WRLD", fields!["image_space": FormId]),
    exact(b"DATA", b"WRLD", 1, fields!["flags": UInt8]),
    by_rec(b"IMPS", b"WRLD", Layout::Bytes),
    by_rec(b"IMPF", b"WRLD", Layout::Bytes),

    // -------------------------------------------------------------------
    // LAND
    // -------------------------------------------------------------------
    by_rec(b"DATA", b"LAND", fields!["flags": UInt32]),
    by_rec(b"VNML", b"LAND", Layout::Bytes),
    by_rec(b"VHGT", b"LAND", fields![
        "offset": Float, "heights": Padding(1092),
    ]),
    by_rec(b"VCLR", b"LAND", Layout::Bytes),
    by_rec(b"ATXT", b"LAND", fields![
        "texture": FormId, "quadrant": UInt8,
        "platform": PlatformByte(0), "layer": Int16,
    ]),
    by_rec(b"BTXT", b"LAND", fields![
        "texture": FormId, "quadrant": UInt8,
        "platform": PlatformByte(0), "layer": Int16,
    ]),
    by_rec(b"VTXT", b"LAND", repeat![
        "position": UInt16, "unused": Padding(2), "opacity": Float,
    ]),
    by_rec(b"VTEX", b"LAND", Layout::FormIdArray),

    // -------------------------------------------------------------------
    // NAVM / NAVI (NVTR, NVDP, NVMI, NVCI and NVGD have dedicated
    // converters beside the dispatcher)
    // -------------------------------------------------------------------
    by_rec(b"DATA", b"NAVM", fields![
        "cell": FormId, "vertex_count": UInt32, "triangle_count": UInt32,
        "external_connection_count": UInt32, "cover_count": UInt32,
        "door_count": UInt32, "unknown": UInt32,
    ]),
    by_rec(b"NVVX", b"NAVM", Layout::FloatArray),
    by_rec(b"NVCA", b"NAVM", repeat!["triangle": UInt16]),
    by_rec(b"NVEX", b"NAVM", repeat![
        "unknown": UInt32, "navmesh": FormId, "triangle": UInt16,
    ]),

    // -------------------------------------------------------------------
    // DIAL / INFO
    // -------------------------------------------------------------------
    by_rec(b"PNAM", b"DIAL", fields!["priority": Float]),
    exact(b"DATA", b"INFO", 2, fields!["type": UInt8, "next_speaker": UInt8]),
    exact(b"DATA", b"INFO", 3, fields![
        "type": UInt8, "next_speaker": UInt8, "flags": UInt8,
    ]),
    exact(b"DATA", b"INFO", 4, fields![
        "type": UInt8, "next_speaker": UInt8, "flags": UInt16,
    ]),
    any(b"TCLT", fields!["choice": FormId]),
    any(b"TCLF", fields!["info": FormId]),
    any(b"TCFU", fields!["follow_up": FormId]),
    by_rec(b"TRDT", b"INFO", fields![
        "emotion_type": UInt32, "emotion_value": Int32, "unused": Padding(4),
        "response_number": UInt8, "unused2": Padding(3),
        "sound": FormId, "flags": UInt8, "unused3": Padding(3),
    ]),
    by_rec(b"PNAM", b"INFO", fields!["previous_info": FormId]),
    by_rec(b"ANAM", b"INFO", fields!["speaker": FormId]),
    by_rec(b"KNAM", b"INFO", fields!["actor_value_or_perk": FormId]),
    by_rec(b"DNAM", b"INFO", fields!["speech_challenge": UInt32]),
    by_rec(b"SNAM", b"INFO", fields!["sound": FormId]),

    // -------------------------------------------------------------------
    // QUST
    // -------------------------------------------------------------------
    by_rec(b"DATA", b"QUST", fields![
        "flags": UInt8, "priority": UInt8, "unused": Padding(2), "delay": Float,
    ]),
    by_rec(b"QSTA", b"QUST", fields![
        "target": FormId, "flags": UInt8, "unused": Padding(3),
    ]),
    by_rec(b"INDX", b"QUST", fields!["stage": Int16]),
    by_rec(b"QSDT", b"QUST", fields!["flags": UInt8]),
    by_rec(b"QOBJ", b"QUST", fields!["index": Int32]),

    // -------------------------------------------------------------------
    // PERK (DATA/5 and DATA/8 are handled by overrides)
    // -------------------------------------------------------------------
    exact(b"DATA", b"PERK", 4, fields![
        "trait": UInt8, "min_level": UInt8, "ranks": UInt8, "playable": UInt8,
    ]),
    by_rec(b"PRKE", b"PERK", fields![
        "type": UInt8, "rank": UInt8, "priority": UInt8,
    ]),
    by_rec(b"PRKC", b"PERK", fields!["run_on": Int8]),
    by_rec(b"EPFT", b"PERK", fields!["function_type": UInt8]),
    by_rec(b"EPF3", b"PERK", fields!["flags": UInt16]),
    exact(b"EPFD", b"PERK", 4, fields!["value": Float]),
    exact(b"EPFD", b"PERK", 8, fields!["value": Float, "multiplier": Float]),
    by_rec(b"PRKF", b"PERK", Layout::Bytes),

    // -------------------------------------------------------------------
    // WEAP
    // -------------------------------------------------------------------
    exact(b"DATA", b"WEAP", 15, fields![
        "value": Int32, "health": Int32, "weight": Float,
        "damage": Int16, "clip_size": UInt8,
    ]),
    exact(b"DNAM", b"WEAP", 204, fields![
        "animation_type": UInt32, "animation_multiplier": Float, "reach": Float,
        "flags1": UInt8, "grip_animation": UInt8, "ammo_use": UInt8,
        "reload_animation": UInt8,
        "min_spread": Float, "spread": Float, "unknown": Float,
        "sight_fov": Float, "unknown2": Float,
        // Already little-endian on the Xbox side; swapping corrupts it.
        "projectile": FormIdLittleEndian,
        "vats_to_hit": UInt8, "attack_animation": UInt8,
        "projectile_count": UInt8, "embedded_weapon_av": UInt8,
        "min_range": Float, "max_range": Float,
        "on_hit": UInt32, "flags2": UInt32,
        "attack_animation_multiplier": Float, "fire_rate": Float,
        "override_action_points": Float,
        "rumble_left": Float, "rumble_right": Float, "rumble_duration": Float,
        "override_damage_to_weapon": Float, "attack_shots_per_second": Float,
        "reload_time": Float, "jam_time": Float, "aim_arc": Float,
        "skill": UInt32, "rumble_pattern": UInt32, "rumble_wavelength": Float,
        "limb_damage_multiplier": Float, "resist_type": UInt32,
        "sight_usage": Float,
        "semi_auto_delay_min": Float, "semi_auto_delay_max": Float,
        "unknown3": Float,
        "effect_mod1": UInt32, "effect_mod2": UInt32, "effect_mod3": UInt32,
        "value_a": Float, "value_b": Float, "value_c": Float,
        "power_attack_override": UInt32, "strength_requirement": UInt32,
        "unknown4": UInt8, "reload_animation_mod": UInt8, "unused": Padding(2),
        "regen_rate": Float, "kill_impulse": Float,
        "value_d": Float, "value_e": Float,
        "impulse_distance": Float, "skill_requirement": UInt32,
        "unknown5": UInt32,
    ]),
    by_rec(b"NAM0", b"WEAP", fields!["ammo": FormId]),
    by_rec(b"VNAM", b"WEAP", fields!["sound_level": UInt32]),
    any(b"WMI1", fields!["mod": FormId]),
    any(b"WMI2", fields!["mod": FormId]),
    any(b"WMI3", fields!["mod": FormId]),

    // -------------------------------------------------------------------
    // AMMO
    // -------------------------------------------------------------------
    exact(b"DATA", b"AMMO", 13, fields![
        "speed": Float, "flags": UInt8, "unused": Padding(3),
        "value": Int32, "clip_rounds": UInt8,
    ]),
    by_rec(b"DAT2", b"AMMO", fields![
        "projectiles_per_shot": UInt32, "projectile": FormId, "weight": Float,
        "consumed_ammo": FormId, "consumed_percentage": Float,
    ]),

    // -------------------------------------------------------------------
    // NPC_ / CREA
    // -------------------------------------------------------------------
    exact(b"DATA", b"NPC_", 11, fields![
        "health": Int32, "attributes": ByteArray(7),
    ]),
    by_rec(b"DNAM", b"NPC_", fields![
        "skill_values": ByteArray(14), "skill_offsets": ByteArray(14),
    ]),
    by_rec(b"SNAM", b"NPC_", fields![
        "faction": FormId, "rank": Int8, "unused": Padding(3),
    ]),
    by_rec(b"INAM", b"NPC_", fields!["death_item": FormId]),
    by_rec(b"CNAM", b"NPC_", fields!["class": FormId]),
    by_rec(b"HNAM", b"NPC_", fields!["hair": FormId]),
    by_rec(b"ENAM", b"NPC_", fields!["eyes": FormId]),
    by_rec(b"HCLR", b"NPC_", fields!["hair_color": ColorRgba]),
    by_rec(b"LNAM", b"NPC_", fields!["hair_length": Float]),
    by_rec(b"PNAM", b"NPC_", fields!["head_part": FormId]),
    by_rec(b"NAM4", b"NPC_", fields!["unarmed_attack": UInt16, "unused": Padding(2)]),
    by_rec(b"NAM5", b"NPC_", fields!["unarmed_damage": UInt16]),
    by_rec(b"NAM6", b"NPC_", fields!["height": Float]),
    by_rec(b"NAM7", b"NPC_", fields!["weight": Float]),
    by_rec(b"FGGS", b"NPC_", Layout::FloatArray),
    by_rec(b"FGGA", b"NPC_", Layout::FloatArray),
    by_rec(b"FGTS", b"NPC_", Layout::FloatArray),
    exact(b"DATA", b"CREA", 17, fields![
        "type": UInt8, "combat_skill": UInt8, "magic_skill": UInt8,
        "stealth_skill": UInt8, "health": UInt16, "unused": Padding(2),
        "attack_damage": Int16, "attributes": ByteArray(7),
    ]),
    by_rec(b"SNAM", b"CREA", fields![
        "faction": FormId, "rank": Int8, "unused": Padding(3),
    ]),
    by_rec(b"CSCR", b"CREA", fields!["inherits_sounds_from": FormId]),
    by_rec(b"CSDI", b"CREA", fields!["sound": FormId]),
    by_rec(b"CSDT", b"CREA", fields!["sound_type": UInt32]),
    by_rec(b"CSDC", b"CREA", fields!["chance": UInt8]),

    // -------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------
    exact(b"DATA", b"ARMO", 12, fields![
        "value": Int32, "max_condition": Int32, "weight": Float,
    ]),
    exact(b"DATA", b"ARMA", 12, fields![
        "value": Int32, "max_condition": Int32, "weight": Float,
    ]),
    exact(b"DNAM", b"ARMO", 4, fields!["armor_rating": Int16, "flags": UInt16]),
    exact(b"DNAM", b"ARMO", 12, fields![
        "armor_rating": Int16, "flags": UInt16,
        "damage_threshold": Float, "unused": Padding(4),
    ]),
    exact(b"DNAM", b"ARMA", 4, fields!["armor_rating": Int16, "flags": UInt16]),
    exact(b"DNAM", b"ARMA", 12, fields![
        "armor_rating": Int16, "flags": UInt16,
        "damage_threshold": Float, "unused": Padding(4),
    ]),
    by_rec(b"DATA", b"BOOK", fields![
        "flags": UInt8, "skill": Int8, "value": Int32, "weight": Float,
    ]),
    by_rec(b"DATA", b"CONT", fields!["flags": UInt8, "weight": Float]),
    by_rec(b"SNAM", b"CONT", fields!["open_sound": FormId]),
    by_rec(b"QNAM", b"CONT", fields!["close_sound": FormId]),
    by_rec(b"SNAM", b"DOOR", fields!["open_sound": FormId]),
    by_rec(b"ANAM", b"DOOR", fields!["close_sound": FormId]),
    by_rec(b"BNAM", b"DOOR", fields!["loop_sound": FormId]),
    by_rec(b"FNAM", b"DOOR", fields!["flags": UInt8]),
    by_rec(b"DATA", b"INGR", fields!["weight": Float]),
    by_rec(b"ENIT", b"INGR", fields![
        "value": Int32, "flags": UInt8, "unused": Padding(3),
    ]),
    by_rec(b"DATA", b"LIGH", fields![
        "time": Int32, "radius": UInt32, "color": ColorRgba, "flags": UInt32,
        "falloff_exponent": Float, "fov": Float, "value": UInt32, "weight": Float,
    ]),
    by_rec(b"FNAM", b"LIGH", fields!["fade": Float]),
    by_rec(b"SNAM", b"LIGH", fields!["sound": FormId]),
    by_rec(b"DATA", b"MISC", fields!["value": Int32, "weight": Float]),
    by_rec(b"DATA", b"KEYM", fields!["value": Int32, "weight": Float]),
    by_rec(b"DATA", b"COBJ", fields!["value": Int32, "weight": Float]),
    by_rec(b"DATA", b"IMOD", fields!["value": Int32, "weight": Float]),
    by_rec(b"ENIT", b"ALCH", fields![
        "value": Int32, "flags": UInt8, "unused": Padding(3),
        "withdrawal_effect": FormId, "addiction_chance": Float,
        "consume_sound": FormId,
    ]),
    by_rec(b"ENIT", b"ENCH", fields![
        "type": UInt32, "unused": Padding(8), "flags": UInt8, "unused2": Padding(3),
    ]),
    by_rec(b"SPIT", b"SPEL", fields![
        "type": UInt32, "cost": UInt32, "level": UInt32,
        "flags": UInt8, "unused": Padding(3),
    ]),
    by_rec(b"DATA", b"NOTE", fields!["type": UInt8]),
    by_rec(b"SNAM", b"NOTE", fields!["sound": FormId]),
    by_rec(b"ONAM", b"NOTE", fields!["quest": FormId]),

    // -------------------------------------------------------------------
    // World objects
    // -------------------------------------------------------------------
    by_rec(b"BRUS", b"STAT", fields!["passthrough_sound": Int8]),
    by_rec(b"RNAM", b"STAT", fields!["sound": FormId]),
    by_rec(b"ONAM", b"SCOL", fields!["static": FormId]),
    by_rec(b"DATA", b"SCOL", repeat![
        "placement": PosRot, "scale": Float,
    ]),
    by_rec(b"DATA", b"MSTT", Layout::Bytes),
    by_rec(b"SNAM", b"MSTT", fields!["sound": FormId]),
    by_rec(b"DNAM", b"PWAT", fields!["flags": UInt32, "water": FormId]),
    by_rec(b"DATA", b"GRAS", fields![
        "density": UInt8, "min_slope": UInt8, "max_slope": UInt8,
        "unused": Padding(1), "water_distance": UInt16, "unused2": Padding(2),
        "water_operation": UInt32, "position_range": Float,
        "height_range": Float, "color_range": Float, "wave_period": Float,
        "flags": UInt8, "unused3": Padding(3),
    ]),
    by_rec(b"SNAM", b"TREE", repeat!["seed": UInt32]),
    by_rec(b"CNAM", b"TREE", Layout::FloatArray),
    by_rec(b"BNAM", b"TREE", fields!["width": Float, "height": Float]),
    by_rec(b"MNAM", b"FURN", fields!["marker_flags": UInt32]),
    by_rec(b"SNAM", b"TACT", fields!["sound": FormId]),
    by_rec(b"VNAM", b"TACT", fields!["voice_type": FormId]),
    by_rec(b"DNAM", b"TERM", fields![
        "difficulty": UInt8, "flags": UInt8, "server_type": UInt8,
        "unused": Padding(1),
    ]),
    by_rec(b"SNAM", b"TERM", fields!["sound": FormId]),
    by_rec(b"PNAM", b"TERM", fields!["password_note": FormId]),
    by_rec(b"ANAM", b"TERM", fields!["menu_item_id": UInt8]),

    // -------------------------------------------------------------------
    // Characters, factions, races
    // -------------------------------------------------------------------
    exact(b"DATA", b"FACT", 1, fields!["flags": UInt8]),
    exact(b"DATA", b"FACT", 2, fields!["flags": UInt8, "flags2": UInt8]),
    exact(b"DATA", b"FACT", 4, fields![
        "flags": UInt8, "flags2": UInt8, "unused": Padding(2),
    ]),
    by_rec(b"XNAM", b"FACT", fields![
        "faction": FormId, "modifier": Int32, "combat_reaction": UInt32,
    ]),
    by_rec(b"RNAM", b"FACT", fields!["rank": Int32]),
    by_rec(b"CNAM", b"FACT", fields!["unused": Float]),
    by_rec(b"DATA", b"CLAS", fields![
        "tag_skill1": Int32, "tag_skill2": Int32,
        "tag_skill3": Int32, "tag_skill4": Int32,
        "flags": UInt32, "services": UInt32,
        "teaches": Int8, "max_training": UInt8, "unused": Padding(2),
    ]),
    by_rec(b"ATTR", b"CLAS", Layout::Bytes),
    by_rec(b"DATA", b"RACE", fields![
        "skill_boosts": ByteArray(14), "unused": Padding(2),
        "male_height": Float, "female_height": Float,
        "male_weight": Float, "female_weight": Float,
        "flags": UInt32,
    ]),
    by_rec(b"VTCK", b"RACE", fields!["male_voice": FormId, "female_voice": FormId]),
    by_rec(b"DNAM", b"RACE", fields!["male_default_hair": FormId, "female_default_hair": FormId]),
    by_rec(b"CNAM", b"RACE", fields!["male_hair_color": UInt8, "female_hair_color": UInt8]),
    by_rec(b"PNAM", b"RACE", fields!["facegen_main_clamp": Float]),
    by_rec(b"UNAM", b"RACE", fields!["facegen_face_clamp": Float]),
    by_rec(b"XNAM", b"RACE", fields!["race": FormId, "adjustment": Int32]),
    by_rec(b"INDX", b"RACE", fields!["index": UInt32]),
    by_rec(b"FGGS", b"RACE", Layout::FloatArray),
    by_rec(b"FGGA", b"RACE", Layout::FloatArray),
    by_rec(b"FGTS", b"RACE", Layout::FloatArray),
    by_rec(b"SNAM", b"RACE", Layout::Bytes),
    by_rec(b"ONAM", b"RACE", fields!["older": FormId]),
    by_rec(b"YNAM", b"RACE", fields!["younger": FormId]),
    by_rec(b"DATA", b"HDPT", fields!["flags": UInt8]),
    by_rec(b"HNAM", b"HDPT", Layout::FormIdArray),
    by_rec(b"DATA", b"HAIR", fields!["flags": UInt8]),
    by_rec(b"DATA", b"EYES", fields!["flags": UInt8]),

    // -------------------------------------------------------------------
    // Magic
    // -------------------------------------------------------------------
    by_rec(b"DATA", b"MGEF", fields![
        "flags": UInt32, "base_cost": Float, "associated_item": FormId,
        "magic_school": Int32, "resist_value": Int32,
        "counter_effect_count": UInt16, "unused": Padding(2),
        "light": FormId, "projectile_speed": Float,
        "effect_shader": FormId, "display_shader": FormId,
        "effect_sound": FormId, "bolt_sound": FormId,
        "hit_sound": FormId, "area_sound": FormId,
        "constant_effect_enchant_factor": Float,
        "constant_effect_barter_factor": Float,
        "archtype": UInt32, "actor_value": Int32,
    ]),

    // -------------------------------------------------------------------
    // Audio
    // -------------------------------------------------------------------
    by_rec(b"SNDD", b"SOUN", fields![
        "min_distance": UInt8, "max_distance": UInt8, "frequency_adjustment": Int8,
        "unused": Padding(1), "flags": UInt32, "static_attenuation": Int16,
        "stop_time": UInt8, "start_time": UInt8,
        "attenuation_points": ByteArray(10), "reverb_attenuation": Int16,
        "priority": Int32, "unused2": Padding(8),
    ]),
    by_rec(b"SNDX", b"SOUN", fields![
        "min_distance": UInt8, "max_distance": UInt8, "frequency_adjustment": Int8,
        "unused": Padding(1), "flags": UInt32, "static_attenuation": Int16,
        "stop_time": UInt8, "start_time": UInt8,
    ]),
    by_rec(b"ANAM", b"SOUN", repeat!["attenuation_point": Int16]),
    by_rec(b"GNAM", b"SOUN", fields!["reverb_attenuation": Int16]),
    by_rec(b"HNAM", b"SOUN", fields!["priority": Int32]),
    by_rec(b"SNAM", b"ASPC", fields!["looping_sound": FormId]),
    by_rec(b"RDAT", b"ASPC", fields!["use_sound_from_region": FormId]),
    by_rec(b"ANAM", b"ASPC", fields!["environment_type": UInt32]),
    by_rec(b"INAM", b"ASPC", fields!["is_interior": UInt32]),

    // -------------------------------------------------------------------
    // Landscape textures
    // -------------------------------------------------------------------
    by_rec(b"TNAM", b"LTEX", fields!["texture": FormId]),
    by_rec(b"HNAM", b"LTEX", fields![
        "material_type": UInt8, "friction": UInt8, "restitution": UInt8,
    ]),
    by_rec(b"SNAM", b"LTEX", fields!["specular_exponent": UInt8]),

    // -------------------------------------------------------------------
    // IDLE
    // -------------------------------------------------------------------
    by_rec(b"ANAM", b"IDLE", Layout::FormIdArray),

    // -------------------------------------------------------------------
    // PACK (PKDT/12 is override-handled)
    // -------------------------------------------------------------------
    exact(b"PKDT", b"PACK", 8, fields![
        "flags": UInt32, "type": UInt8, "unused": Padding(1),
        "behavior_flags": UInt16,
    ]),
    any(b"PLDT", fields!["type": Int32, "target": UInt32, "radius": Int32]),
    any(b"PLD2", fields!["type": Int32, "target": UInt32, "radius": Int32]),
    any(b"PSDT", fields![
        "month": Int8, "day_of_week": Int8, "date": UInt8, "time": Int8,
        "duration": Int32,
    ]),
    any(b"PTDT", fields![
        "type": Int32, "target": UInt32, "count": Int32, "unknown": Float,
    ]),
    any(b"PTD2", fields![
        "type": Int32, "target": UInt32, "count": Int32, "unknown": Float,
    ]),
    by_rec(b"PKPT", b"PACK", Layout::Bytes),
    by_rec(b"PKDD", b"PACK", fields![
        "fov": Float, "topic": FormId, "flags": UInt32, "unused": Padding(12),
    ]),
    by_rec(b"INAM", b"PACK", fields!["idle": FormId]),
    any(b"POBA", Layout::Bytes),
    any(b"POEA", Layout::Bytes),
    any(b"POCA", Layout::Bytes),

    // -------------------------------------------------------------------
    // CSTY
    // -------------------------------------------------------------------
    by_rec(b"CSTD", b"CSTY", fields![
        "dodge_chance": UInt8, "lr_chance": UInt8, "unused": Padding(2),
        "lr_timer_min": Float, "lr_timer_max": Float,
        "forward_timer_min": Float, "forward_timer_max": Float,
        "back_timer_min": Float, "back_timer_max": Float,
        "idle_timer_min": Float, "idle_timer_max": Float,
        "block_chance": UInt8, "attack_chance": UInt8, "unused2": Padding(2),
        "recoil_bonus": Float, "unconscious_bonus": Float,
        "hand_to_hand_bonus": Float,
        "power_attack_chance": UInt8, "unused3": Padding(3),
        "recoil_power_bonus": Float, "unconscious_power_bonus": Float,
        "power_attack_normal": UInt8, "power_attack_forward": UInt8,
        "power_attack_back": UInt8, "power_attack_left": UInt8,
        "power_attack_right": UInt8, "unused4": Padding(3),
        "hold_timer_min": Float, "hold_timer_max": Float,
        "flags": UInt16, "unused5": Padding(2),
    ]),
    by_rec(b"CSAD", b"CSTY", Layout::FloatArray),
    by_rec(b"CSSD", b"CSTY", Layout::FloatArray),

    // -------------------------------------------------------------------
    // Weather and climate (WTHR INAM/304 is override-handled, *IAD keys
    // are matched by the keyed-pair rule)
    // -------------------------------------------------------------------
    exact(b"FNAM", b"WTHR", 16, fields![
        "day_fog_near": Float, "day_fog_far": Float,
        "night_fog_near": Float, "night_fog_far": Float,
    ]),
    exact(b"FNAM", b"WTHR", 24, fields![
        "day_fog_near": Float, "day_fog_far": Float,
        "night_fog_near": Float, "night_fog_far": Float,
        "day_fog_power": Float, "night_fog_power": Float,
    ]),
    by_rec(b"DATA", b"WTHR", Layout::Bytes),
    by_rec(b"PNAM", b"WTHR", Layout::Bytes),
    by_rec(b"NAM0", b"WTHR", Layout::Bytes),
    by_rec(b"ONAM", b"WTHR", Layout::Bytes),
    by_rec(b"WLST", b"CLMT", repeat![
        "weather": FormId, "chance": Int32, "global": FormId,
    ]),
    by_rec(b"TNAM", b"CLMT", fields![
        "sunrise_begin": UInt8, "sunrise_end": UInt8,
        "sunset_begin": UInt8, "sunset_end": UInt8,
        "volatility": UInt8, "moons": UInt8,
    ]),

    // -------------------------------------------------------------------
    // REGN
    // -------------------------------------------------------------------
    by_rec(b"RCLR", b"REGN", fields!["map_color": ColorRgba]),
    by_rec(b"RPLI", b"REGN", fields!["edge_falloff": UInt32]),
    by_rec(b"RPLD", b"REGN", repeat!["x": Float, "y": Float]),
    by_rec(b"RDAT", b"REGN", fields![
        "type": UInt32, "flags": UInt8, "priority": UInt8, "unused": Padding(2),
    ]),
    by_rec(b"RDOT", b"REGN", repeat![
        "object": FormId, "parent_index": UInt16, "unused": Padding(2),
        "density": Float, "clustering": UInt8, "min_slope": UInt8,
        "max_slope": UInt8, "flags": UInt8, "radius_wrt_parent": UInt16,
        "radius": UInt16, "min_height": Float, "max_height": Float,
        "sink": Float, "sink_variance": Float, "size_variance": Float,
        "angle_variance_x": UInt16, "angle_variance_y": UInt16,
        "angle_variance_z": UInt16, "unused2": Padding(2),
        "vertex_shading": ColorRgba,
    ]),
    by_rec(b"RDGS", b"REGN", repeat!["grass": FormId, "unused": Padding(4)]),
    by_rec(b"RDSD", b"REGN", repeat![
        "sound": FormId, "flags": UInt32, "chance": UInt32,
    ]),
    by_rec(b"RDWT", b"REGN", repeat![
        "weather": FormId, "chance": UInt32, "global": FormId,
    ]),
    by_rec(b"RDID", b"REGN", Layout::FormIdArray),
    by_rec(b"RDMD", b"REGN", fields!["music_type": UInt32]),

    // -------------------------------------------------------------------
    // Water
    // -------------------------------------------------------------------
    by_rec(b"DATA", b"WATR", fields!["damage": UInt16]),
    by_rec(b"SNAM", b"WATR", fields!["sound": FormId]),
    by_rec(b"GNAM", b"WATR", fields![
        "daytime": FormId, "nighttime": FormId, "underwater": FormId,
    ]),
    by_rec(b"DNAM", b"WATR", fields![
        "unknown1": Float, "unknown2": Float, "unknown3": Float, "unknown4": Float,
        "sun_power": Float, "reflectivity": Float, "fresnel": Float,
        "unused": Padding(4),
        "fog_above_distance": Float, "fog_above_power": Float,
        "shallow_color": ColorRgba, "deep_color": ColorRgba,
        "reflection_color": ColorRgba, "unused2": Padding(4),
        "rain_force": Float, "rain_velocity": Float, "rain_falloff": Float,
        "rain_dampner": Float, "rain_size": Float,
        "displacement_force": Float, "displacement_velocity": Float,
        "displacement_falloff": Float, "displacement_dampner": Float,
        "displacement_size": Float,
        "noise_scale": Float,
        "noise_layer1_wind_direction": Float, "noise_layer2_wind_direction": Float,
        "noise_layer3_wind_direction": Float,
        "noise_layer1_wind_speed": Float, "noise_layer2_wind_speed": Float,
        "noise_layer3_wind_speed": Float,
        "fog_above_depth": Float, "fog_above_falloff": Float,
        "fog_below_color_r": Float,
        "fog_below_distance": Float, "fog_below_power": Float,
        "fog_below_depth": Float, "fog_below_falloff": Float,
        "refraction_magnitude": Float, "specular_power": Float,
        "specular_radius": Float, "specular_brightness": Float,
        "noise_layer1_uv_scale": Float, "noise_layer2_uv_scale": Float,
        "noise_layer3_uv_scale": Float,
        "noise_layer1_amplitude": Float, "noise_layer2_amplitude": Float,
        "noise_layer3_amplitude": Float,
        "noise_layer1_falloff": Float, "noise_layer2_falloff": Float,
        "noise_layer3_falloff": Float,
    ]),

    // -------------------------------------------------------------------
    // Effects
    // -------------------------------------------------------------------
    by_rec(b"DATA", b"EFSH", fields![
        "flags": UInt8, "unused": Padding(3),
        "membrane_source_blend": UInt32, "membrane_blend_op": UInt32,
        "membrane_z_test": UInt32, "fill_color1": ColorRgba,
        "fill_alpha_fade_in_time": Float, "fill_full_alpha_time": Float,
        "fill_alpha_fade_out_time": Float, "fill_persistent_alpha": Float,
        "fill_alpha_pulse_amplitude": Float, "fill_alpha_pulse_frequency": Float,
        "fill_texture_speed_u": Float, "fill_texture_speed_v": Float,
        "edge_fall_off": Float, "edge_color": ColorRgba,
        "edge_alpha_fade_in_time": Float, "edge_full_alpha_time": Float,
        "edge_alpha_fade_out_time": Float, "edge_persistent_alpha": Float,
        "edge_alpha_pulse_amplitude": Float, "edge_alpha_pulse_frequency": Float,
        "fill_full_alpha_ratio": Float, "edge_full_alpha_ratio": Float,
        "membrane_dest_blend": UInt32,
        "particle_source_blend": UInt32, "particle_blend_op": UInt32,
        "particle_z_test": UInt32, "particle_dest_blend": UInt32,
        "particle_birth_ramp_up_time": Float, "particle_birth_full_time": Float,
        "particle_birth_ramp_down_time": Float, "particle_birth_full_ratio": Float,
        "particle_persistent_count": UInt32, "particle_lifetime": Float,
        "particle_lifetime_delta": Float, "particle_speed_along_normal": Float,
        "particle_acceleration_along_normal": Float,
        "particle_initial_velocity_x": Float, "particle_initial_velocity_y": Float,
        "particle_initial_velocity_z": Float,
        "particle_acceleration_x": Float, "particle_acceleration_y": Float,
        "particle_acceleration_z": Float,
        "particle_initial_scale": Float, "particle_final_scale": Float,
        "particle_scale_variation": Float, "particle_initial_rotation": Float,
        "particle_rotation_variation": Float, "particle_rotation_speed": Float,
        "particle_rotation_speed_delta": Float,
        "addon_models": FormId,
        "holes_start_time": Float, "holes_end_time": Float,
        "holes_start_value": Float, "holes_end_value": Float,
        "edge_width_alpha_units": Float, "edge_tint": ColorRgba,
        "explosion_wind_speed": Float,
        "texture_count_u": UInt32, "texture_count_v": UInt32,
        "addon_fade_in_time": Float, "addon_fade_out_time": Float,
        "addon_scale_start": Float, "addon_scale_end": Float,
        "addon_scale_in_time": Float, "addon_scale_out_time": Float,
    ]),
    exact(b"DATA", b"EXPL", 36, fields![
        "force": Float, "damage": Float, "radius": Float,
        "light": FormId, "sound1": FormId, "flags": UInt32,
        "impact_dataset": FormId, "sound2": FormId,
        "radiation_level": Float,
    ]),
    exact(b"DATA", b"EXPL", 52, fields![
        "force": Float, "damage": Float, "radius": Float,
        "light": FormId, "sound1": FormId, "flags": UInt32,
        "impact_dataset": FormId, "sound2": FormId,
        "radiation_level": Float, "radiation_dissipation_time": Float,
        "radiation_radius": Float, "sound_level": UInt32,
        "placed_object": FormId,
    ]),
    by_rec(b"DATA", b"DEBR", Layout::Bytes),
    by_rec(b"DATA", b"PROJ", fields![
        "flags": UInt16, "type": UInt16,
        "gravity": Float, "speed": Float, "range": Float,
        "light": FormId, "muzzle_flash_light": FormId,
        "tracer_chance": Float, "explosion_proximity": Float, "timer": Float,
        "explosion": FormId, "sound": FormId,
        "muzzle_flash_duration": Float, "fade_duration": Float,
        "impact_force": Float,
        "sound_countdown": FormId, "sound_disable": FormId,
        "default_weapon_source": FormId,
        "rotation_x": Float, "rotation_y": Float, "rotation_z": Float,
        "bouncy_multiplier": Float,
    ]),
    by_rec(b"DNAM", b"IMGS", Layout::FloatArray),
    by_rec(b"HNAM", b"IMGS", Layout::FloatArray),
    by_rec(b"CNAM", b"IMGS", Layout::FloatArray),
    by_rec(b"TNAM", b"IMGS", Layout::FloatArray),
    by_rec(b"LNAM", b"FLST", Layout::FormIdArray),

    // -------------------------------------------------------------------
    // Body part data
    // -------------------------------------------------------------------
    by_rec(b"BPND", b"BPTD", fields![
        "damage_multiplier": Float, "flags": UInt8, "part_type": UInt8,
        "health_percent": UInt8, "actor_value": Int8, "to_hit_chance": UInt8,
        "explodable_chance": UInt8, "explodable_debris_count": UInt16,
        "explodable_debris": FormId, "explodable_explosion": FormId,
        "tracking_max_angle": Float, "explodable_debris_scale": Float,
        "severable_debris_count": Int32, "severable_debris": FormId,
        "severable_explosion": FormId, "severable_debris_scale": Float,
        "gore_translate_x": Float, "gore_translate_y": Float,
        "gore_translate_z": Float,
        "gore_rotation_x": Float, "gore_rotation_y": Float,
        "gore_rotation_z": Float,
        "severable_impact_dataset": FormId, "explodable_impact_dataset": FormId,
        "severable_decal_count": UInt8, "explodable_decal_count": UInt8,
        "unused": Padding(2), "limb_replacement_scale": Float,
    ]),

    // -------------------------------------------------------------------
    // Misc systems
    // -------------------------------------------------------------------
    by_rec(b"DATA", b"ADDN", fields!["node_index": Int32]),
    by_rec(b"DNAM", b"ADDN", fields!["particle_cap": UInt16, "flags": UInt16]),
    by_rec(b"SNAM", b"ADDN", fields!["sound": FormId]),
    by_rec(b"CNAM", b"AVIF", fields!["unknown": UInt32]),
    by_rec(b"DATA", b"CAMS", fields![
        "action": UInt32, "location": UInt32, "target": UInt32,
        "flags": UInt32, "player_time_multiplier": Float,
        "target_time_multiplier": Float, "global_time_multiplier": Float,
        "max_time": Float, "min_time": Float, "target_percent": Float,
    ]),
    by_rec(b"MNAM", b"CAMS", fields!["model": FormId]),
    by_rec(b"ANAM", b"CPTH", Layout::FormIdArray),
    by_rec(b"DATA", b"CPTH", fields!["zoom": UInt8]),
    by_rec(b"SNAM", b"CPTH", fields!["camera_shot": FormId]),
    by_rec(b"DNAM", b"VTYP", fields!["flags": UInt8]),
    by_rec(b"DATA", b"IPCT", fields![
        "effect_duration": Float, "effect_orientation": UInt32,
        "angle_threshold": Float, "placement_radius": Float,
        "sound_level": UInt32, "flags": UInt32,
    ]),
    by_rec(b"DATA", b"IPDS", Layout::FormIdArray),
    by_rec(b"DATA", b"ECZN", fields![
        "owner": FormId, "rank": Int8, "min_level": Int8,
        "flags": UInt8, "unused": Padding(1),
    ]),
    by_rec(b"DNAM", b"MESG", fields!["flags": UInt32]),
    by_rec(b"TNAM", b"MESG", fields!["display_time": UInt32]),
    by_rec(b"DATA", b"RGDL", fields![
        // Middle-endian on Xbox: both 16-bit halves are byte-swapped in
        // place rather than reversing the whole word.
        "dynamic_bone_count": UInt32WordSwapped,
        "unused": Padding(4), "weight": Float, "buoyancy": Float,
        "material": UInt32,
    ]),
    by_rec(b"RAFD", b"RGDL", Layout::FloatArray),
    by_rec(b"RAFB", b"RGDL", Layout::Bytes),
    by_rec(b"DATA", b"DOBJ", Layout::FormIdArray),
    by_rec(b"DATA", b"LGTM", fields![
        "ambient": ColorRgba, "directional": ColorRgba, "fog": ColorRgba,
        "fog_near": Float, "fog_far": Float,
        "rotation_xy": Int32, "rotation_z": Int32,
        "directional_fade": Float, "fog_clip": Float,
    ]),
    by_rec(b"DATA", b"REPU", fields!["value": Float]),
    by_rec(b"DATA", b"CHAL", fields![
        "type": UInt32, "threshold": UInt32, "flags": UInt32,
        "interval": UInt32, "value1": UInt16, "value2": UInt16,
        "value3": UInt32,
    ]),
    by_rec(b"SNAM", b"CHAL", fields!["sound": FormId]),
    by_rec(b"XNAM", b"CHAL", fields!["script": FormId]),
    by_rec(b"DATA", b"AMEF", fields![
        "type": UInt32, "operation": UInt32, "value": Float,
    ]),
    by_rec(b"DATA", b"CCRD", fields!["card_value": UInt32]),
    by_rec(b"DATA", b"CDCK", fields!["count": UInt32]),
    by_rec(b"CARD", b"CDCK", fields!["card": FormId]),
    by_rec(b"DATA", b"DEHY", repeat!["trigger_threshold": UInt32, "effect": FormId]),
    by_rec(b"DATA", b"HUNG", repeat!["trigger_threshold": UInt32, "effect": FormId]),
    by_rec(b"DATA", b"SLPD", repeat!["trigger_threshold": UInt32, "effect": FormId]),
    by_rec(b"NAM1", b"ALOC", fields!["flags": UInt32]),
    by_rec(b"NAM1", b"MSET", fields!["type": UInt32]),
    // The load-screen grid halves are already PC-ordered on the console.
    by_rec(b"LNAM", b"LSCR", repeat![
        "location": FormId,
        "grid_y": UInt16LittleEndian, "grid_x": UInt16LittleEndian,
    ]),
    by_rec(b"DATA", b"ANIO", fields!["animation": FormId]),
    by_rec(b"DATA", b"LSCT", fields![
        "type": UInt32, "x": UInt32, "y": UInt32,
        "width": UInt32, "height": UInt32, "orientation": UInt32,
        "font1": UInt32, "text_color": ColorRgba, "align": UInt32,
        "unknown": ByteArray(20),
        "interval": UInt16, "texture_width": UInt16, "texture_height": UInt16,
        "offset_x": UInt16, "offset_y": UInt16,
    ]),
];

type Key = ([u8; 4], Option<[u8; 4]>, Option<u16>);

/// Process-wide, read-only subrecord layout catalog.
pub struct SchemaRegistry {
    exact: HashMap<([u8; 4], [u8; 4], u16), Layout>,
    by_record: HashMap<([u8; 4], [u8; 4]), Layout>,
    by_length: HashMap<([u8; 4], u16), Layout>,
    by_signature: HashMap<[u8; 4], Layout>,
    strings_any: HashSet<[u8; 4]>,
    strings_by_record: HashSet<([u8; 4], [u8; 4])>,
}

impl SchemaRegistry {
    fn build() -> Self {
        let mut registry = SchemaRegistry {
            exact: HashMap::new(),
            by_record: HashMap::new(),
            by_length: HashMap::new(),
            by_signature: HashMap::new(),
            strings_any: HashSet::new(),
            strings_by_record: HashSet::new(),
        };
        for entry in SCHEMAS {
            let key: Key = (entry.sig, entry.rec, entry.len);
            match key {
                (sig, Some(rec), Some(len)) => {
                    registry.exact.insert((sig, rec, len), entry.layout);
                }
                (sig, Some(rec), None) => {
                    registry.by_record.insert((sig, rec), entry.layout);
                }
                (sig, None, Some(len)) => {
                    registry.by_length.insert((sig, len), entry.layout);
                }
                (sig, None, None) => {
                    registry.by_signature.insert(sig, entry.layout);
                }
            }
        }
        for (sig, rec) in STRING_SUBRECORDS {
            match rec {
                Some(rec) => {
                    registry.strings_by_record.insert((*sig, *rec));
                }
                None => {
                    registry.strings_any.insert(*sig);
                }
            }
        }
        registry
    }

    /// Whether `(sig, rec)` names a string subrecord (passed through).
    pub fn is_string(&self, sig: [u8; 4], rec: [u8; 4]) -> bool {
        self.strings_by_record.contains(&(sig, rec)) || self.strings_any.contains(&sig)
    }

    /// Priority lookup described in the module docs.
    pub fn lookup(&self, sig: [u8; 4], rec: [u8; 4], len: usize) -> Option<Layout> {
        let len16 = if len <= u16::MAX as usize {
            Some(len as u16)
        } else {
            None
        };

        if rec == *b"IMAD" {
            return Some(imad_layout(sig));
        }
        if let Some(len16) = len16 {
            if let Some(layout) = self.exact.get(&(sig, rec, len16)) {
                return Some(*layout);
            }
        }
        if let Some(layout) = self.by_record.get(&(sig, rec)) {
            return Some(*layout);
        }
        if let Some(len16) = len16 {
            if let Some(layout) = self.by_length.get(&(sig, len16)) {
                return Some(*layout);
            }
        }
        if let Some(layout) = self.by_signature.get(&sig) {
            return Some(*layout);
        }
        if sig == *b"DATA" {
            return Some(data_fallback(len));
        }
        if rec == *b"WTHR" && is_iad_key(sig) {
            return Some(Layout::Repeat(IAD_KEY));
        }
        None
    }
}

/// Untyped `DATA` heuristic: tiny payloads are opaque, mid-sized multiples
/// of four are float/int words, everything else is opaque.
fn data_fallback(len: usize) -> Layout {
    if len <= 2 {
        Layout::Bytes
    } else if len <= 64 && len % 4 == 0 {
        Layout::FloatArray
    } else {
        Layout::Bytes
    }
}

/// Image-space modifiers are almost entirely float streams; the keyed
/// `*IAD` subrecords hold time/value pairs.
fn imad_layout(sig: [u8; 4]) -> Layout {
    if sig == *b"EDID" {
        Layout::String
    } else if is_iad_key(sig) {
        Layout::Repeat(IAD_KEY)
    } else {
        Layout::FloatArray
    }
}

fn is_iad_key(sig: [u8; 4]) -> bool {
    &sig[1..] == b"IAD"
}

pub fn registry() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SchemaRegistry::build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_sizes() {
        let registry = registry();
        let layout = registry.lookup(*b"CTDA", *b"INFO", 28).unwrap();
        assert_eq!(layout.element_size(), Some(28));
        let layout = registry.lookup(*b"SCHR", *b"INFO", 20).unwrap();
        assert_eq!(layout.element_size(), Some(20));
        let layout = registry.lookup(*b"TRDT", *b"INFO", 24).unwrap();
        assert_eq!(layout.element_size(), Some(24));
        let layout = registry.lookup(*b"OBND", *b"WEAP", 12).unwrap();
        assert_eq!(layout.element_size(), Some(12));
        let layout = registry.lookup(*b"ACBS", *b"NPC_", 24).unwrap();
        assert_eq!(layout.element_size(), Some(24));
        let layout = registry.lookup(*b"AIDT", *b"NPC_", 20).unwrap();
        assert_eq!(layout.element_size(), Some(20));
        let layout = registry.lookup(*b"DNAM", *b"WEAP", 204).unwrap();
        assert_eq!(layout.element_size(), Some(204));
        let layout = registry.lookup(*b"DODT", *b"IPCT", 36).unwrap();
        assert_eq!(layout.element_size(), Some(36));
        let layout = registry.lookup(*b"DATA", *b"MGEF", 72).unwrap();
        assert_eq!(layout.element_size(), Some(72));
        let layout = registry.lookup(*b"SNDD", *b"SOUN", 36).unwrap();
        assert_eq!(layout.element_size(), Some(36));
        let layout = registry.lookup(*b"BPND", *b"BPTD", 84).unwrap();
        assert_eq!(layout.element_size(), Some(84));
    }

    #[test]
    fn record_specific_beats_generic() {
        let registry = registry();
        // PNAM is a float priority in DIAL but a FormID in INFO.
        match registry.lookup(*b"PNAM", *b"DIAL", 4).unwrap() {
            Layout::Fields(fields) => assert_eq!(fields[0].ty, Float),
            other => panic!("unexpected layout {:?}", other),
        }
        match registry.lookup(*b"PNAM", *b"INFO", 4).unwrap() {
            Layout::Fields(fields) => assert_eq!(fields[0].ty, FormId),
            other => panic!("unexpected layout {:?}", other),
        }
    }

    #[test]
    fn length_specific_beats_record_agnostic() {
        let registry = registry();
        match registry.lookup(*b"XCLC", *b"CELL", 12).unwrap() {
            Layout::Fields(fields) => assert_eq!(fields.len(), 3),
            other => panic!("unexpected layout {:?}", other),
        }
        match registry.lookup(*b"XCLC", *b"CELL", 8).unwrap() {
            Layout::Fields(fields) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected layout {:?}", other),
        }
    }

    #[test]
    fn data_fallback_heuristic() {
        let registry = registry();
        assert!(matches!(
            registry.lookup(*b"DATA", *b"GMST", 2),
            Some(Layout::Bytes)
        ));
        assert!(matches!(
            registry.lookup(*b"DATA", *b"GMST", 4),
            Some(Layout::FloatArray)
        ));
        assert!(matches!(
            registry.lookup(*b"DATA", *b"GMST", 48),
            Some(Layout::FloatArray)
        ));
        assert!(matches!(
            registry.lookup(*b"DATA", *b"GMST", 70),
            Some(Layout::Bytes)
        ));
    }

    #[test]
    fn imad_rule() {
        let registry = registry();
        assert!(matches!(
            registry.lookup(*b"EDID", *b"IMAD", 10),
            Some(Layout::String)
        ));
        assert!(matches!(
            registry.lookup(*b"BIAD", *b"IMAD", 16),
            Some(Layout::Repeat(_))
        ));
        assert!(matches!(
            registry.lookup(*b"RNAM", *b"IMAD", 32),
            Some(Layout::FloatArray)
        ));
        // WTHR shares the keyed-pair shape.
        assert!(matches!(
            registry.lookup(*b"SIAD", *b"WTHR", 24),
            Some(Layout::Repeat(_))
        ));
    }

    #[test]
    fn string_lookup() {
        let registry = registry();
        assert!(registry.is_string(*b"EDID", *b"WEAP"));
        assert!(registry.is_string(*b"RNAM", *b"INFO"));
        assert!(!registry.is_string(*b"RNAM", *b"FACT"));
        assert!(registry.is_string(*b"ONAM", *b"AMMO"));
        assert!(!registry.is_string(*b"ONAM", *b"TES4"));
    }

    #[test]
    fn unknown_subrecord_has_no_layout() {
        let registry = registry();
        assert!(registry.lookup(*b"ZZZZ", *b"WEAP", 10).is_none());
    }
}
