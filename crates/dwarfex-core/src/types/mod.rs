//! # Types
//!
//! Small value types shared by every stage of the extractor.

pub mod offset;
pub mod source;

pub use offset::EntryOffset;
pub use source::{LoadSegment, SourceLocation};
