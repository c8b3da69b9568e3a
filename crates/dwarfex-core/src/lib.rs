//! # dwarfex-core
//!
//! Extracts type and variable descriptions from the DWARF debugging
//! information of ELF binaries and emits them as a normalized JSON type graph.
//!
//! The crate is organised as a pipeline of stages, each in its own module:
//!
//! - [`dwarf`]: reads the ELF file and decodes `.debug_info` into the owned
//!   [`entry`] model
//! - [`classify`] and [`index`]: what kind each entry is and how to find it
//! - [`select`]: which top-level entries the user asked for
//! - [`graph`]: the dependency closure of the selection, as an arena graph
//! - [`normalize`]: declaration completion, anonymous type naming and typedef
//!   handling
//! - [`comments`]: optional source comment correlation
//! - [`emit`] and [`validate`]: JSON records and post-hoc checks
//!
//! [`export::Exporter`] runs all of them in order. Only decoding can fail;
//! the rest reports what it noticed through [`report::Report`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use dwarfex_core::comments::LocalSources;
//! use dwarfex_core::dwarf::{load_debug_info, DecodeOptions};
//! use dwarfex_core::export::{ExportOptions, Exporter};
//!
//! let info = load_debug_info("firmware.elf", &DecodeOptions::default())?;
//! let export = Exporter::new(&info, ExportOptions::default()).run(&LocalSources);
//! println!("{}", export.to_json()?);
//! # Ok::<(), dwarfex_core::DwarfexError>(())
//! ```

pub mod classify;
pub mod comments;
pub mod dwarf;
pub mod emit;
pub mod entry;
pub mod error;
pub mod export;
pub mod graph;
pub mod index;
pub mod normalize;
pub mod prelude;
pub mod report;
pub mod select;
pub mod types;
pub mod validate;

pub use error::{DwarfexError, DwarfexResult};
pub use export::{Export, ExportOptions, Exporter};
