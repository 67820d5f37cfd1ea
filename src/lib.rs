//! # FNV ESM Convert
//!
//! `fnv-esm-convert` is a library for converting Xbox 360 Fallout: New
//! Vegas master files into the little-endian plugin layout the PC edition
//! loads.
//!
//! The console build mutates more than byte order: record and group
//! hierarchies are flattened behind streaming markers, dialogue records
//! are split in two, and the worldspace offset tables reflect the disc
//! layout. [`convert`] reconstructs the logical hierarchy in a first pass,
//! then streams out a PC-canonical file, field-by-field byte-swapped
//! according to a schema catalog of the game's record formats.
#[macro_use]
extern crate bitflags;

mod bytes;
pub mod cell_order;
mod compression;
mod convert;
mod error;
mod group;
mod index;
mod info_merge;
mod navmesh;
mod ofst;
mod processor;
mod record;
mod schema;
mod stats;
mod verify;

pub use convert::{convert, is_xbox_master_file, Conversion};
pub use error::ConvertError;
pub use stats::Stats;
pub use verify::{verify, VerifyReport};
