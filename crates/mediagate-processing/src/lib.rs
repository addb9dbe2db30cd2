//! Media attribute extraction
//!
//! The workflow engine reads a fixed attribute set from every new or staged
//! file through [`MetadataExtractor`]. [`FfprobeExtractor`] is the production
//! implementation.

pub mod ffprobe;
pub mod traits;

pub use ffprobe::{parse_probe_output, FfprobeExtractor};
pub use traits::MetadataExtractor;
