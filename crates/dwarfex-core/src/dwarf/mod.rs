//! # ELF/DWARF Loading
//!
//! [`BinaryImage`] owns the bytes of the DWARF sections of one ELF file and
//! builds a `gimli::Dwarf` over them on first use. The [`decoder`] walks that
//! `Dwarf` into the owned [`DebugInfo`](crate::entry::DebugInfo) forest.
//!
//! Sections are copied out of the mapped file (decompressing `SHF_COMPRESSED`
//! sections on the way) into `Arc<[u8]>` buffers, so the image does not
//! borrow from the file data and readers can be cloned freely.

pub mod decoder;

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::elf::PT_LOAD;
use object::read::elf::{ElfFile, FileHeader, ProgramHeader};
use object::{Object, ObjectSection, ReadRef};
use once_cell::sync::OnceCell;

pub use decoder::{load_debug_info, DecodeOptions, Decoder};

use crate::error::{map_dwarf_error, DwarfexError, DwarfexResult};
use crate::types::LoadSegment;

pub(crate) type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub(crate) type OwnedDwarf = Dwarf<OwnedReader>;

/// Sections read from the file, keyed by their ELF name.
const DWARF_SECTIONS: &[&str] = &[
    ".debug_abbrev",
    ".debug_addr",
    ".debug_info",
    ".debug_line",
    ".debug_line_str",
    ".debug_ranges",
    ".debug_rnglists",
    ".debug_str",
    ".debug_str_offsets",
    ".debug_loc",
    ".debug_loclists",
];

/// An ELF file opened for debug-info extraction.
pub struct BinaryImage
{
    path: PathBuf,
    endian: RunTimeEndian,
    build_time: Option<DateTime<Utc>>,
    segments: Vec<LoadSegment>,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    dwarf_cache: OnceCell<OwnedDwarf>,
}

impl BinaryImage
{
    /// Read and parse `path`.
    ///
    /// The file's modification time stands in for the build time when
    /// checking whether source files changed after compilation.
    pub fn open(path: impl AsRef<Path>) -> DwarfexResult<Self>
    {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)?;
        let data = Arc::<[u8]>::from(bytes);
        let file = object::File::parse(&*data).map_err(|source| DwarfexError::Object {
            path: path.clone(),
            source,
        })?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let build_time = fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let segments = match &file {
            object::File::Elf32(elf) => load_segments(elf),
            object::File::Elf64(elf) => load_segments(elf),
            _ => {
                tracing::debug!(path = %path.display(), "not an ELF file, physical addresses unavailable");
                Vec::new()
            }
        };

        let mut sections = HashMap::new();
        for name in DWARF_SECTIONS {
            let bytes = load_section_bytes(&file, name)?;
            sections.insert(*name, bytes);
        }

        tracing::debug!(
            path = %path.display(),
            segments = segments.len(),
            debug_info = sections.get(".debug_info").map_or(0, |bytes| bytes.len()),
            "opened binary image"
        );

        Ok(Self {
            path,
            endian,
            build_time,
            segments,
            debug_sections: sections,
            dwarf_cache: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn build_time(&self) -> Option<DateTime<Utc>>
    {
        self.build_time
    }

    /// `PT_LOAD` program headers, empty for non-ELF files.
    pub fn segments(&self) -> &[LoadSegment]
    {
        &self.segments
    }

    /// Whether `.debug_info` has any content.
    pub fn has_debug_info(&self) -> bool
    {
        self.debug_sections
            .get(".debug_info")
            .is_some_and(|bytes| !bytes.is_empty())
    }

    pub(crate) fn dwarf(&self) -> DwarfexResult<&OwnedDwarf>
    {
        self.dwarf_cache.get_or_try_init(|| {
            Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
                .map_err(|err| map_dwarf_error("loading DWARF sections", err))
        })
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .debug_sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }
}

fn load_section_bytes(file: &object::File<'_>, name: &str) -> DwarfexResult<Arc<[u8]>>
{
    let Some(section) = file.section_by_name(name) else {
        return Ok(Arc::<[u8]>::from(Vec::new()));
    };
    let data = section
        .uncompressed_data()
        .map_err(|err| DwarfexError::InvalidArgument(format!("failed to read {name}: {err}")))?;
    Ok(match data {
        Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
        Cow::Owned(vec) => vec.into(),
    })
}

fn load_segments<'data, Elf, R>(elf: &ElfFile<'data, Elf, R>) -> Vec<LoadSegment>
where
    Elf: FileHeader,
    R: ReadRef<'data>,
{
    let endian = elf.endian();
    elf.elf_program_headers()
        .iter()
        .filter(|header| header.p_type(endian) == PT_LOAD)
        .map(|header| LoadSegment {
            virtual_address: header.p_vaddr(endian).into(),
            physical_address: header.p_paddr(endian).into(),
            size: header.p_memsz(endian).into(),
        })
        .collect()
}
