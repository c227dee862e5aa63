use crate::nbt::TagKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort an export.
///
/// Nothing here is transient: the core does no I/O of its own apart from writing into in-memory
/// buffers, so every error is returned straight to the caller and never retried.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum Error {
    #[display("tag kind {kind:?} cannot be serialized")]
    UnsupportedTagKind { kind: TagKind },

    #[display("list of {expected:?} has a {found:?} element at index {index}")]
    InvalidListElement {
        expected: TagKind,
        found: TagKind,
        index: usize,
    },

    #[display("root tag must be a compound, got {kind:?}")]
    RootNotCompound { kind: TagKind },

    #[display("unsupported schematic format {version:?}")]
    UnsupportedVersion { version: String },

    #[display("string of {len} bytes does not fit a 16-bit length prefix")]
    StringTooLong { len: usize },

    #[display("{axis} = {value} is out of range")]
    DimensionOutOfRange { axis: &'static str, value: usize },

    #[display("grid has {actual} cells, expected {width}x{length} = {expected}")]
    GridSizeMismatch {
        width: usize,
        length: usize,
        expected: usize,
        actual: usize,
    },

    #[display("no {role} candidates left after filtering")]
    NoCandidateBlocks { role: &'static str },

    #[display("palette index {index} at position {position} is negative")]
    InvalidPaletteIndex { index: i32, position: usize },

    #[display("no legacy block id for {identifier}")]
    UnknownLegacyBlock { identifier: String },

    #[display("cannot reserve air in a palette that already has {len} entries")]
    PaletteNotEmpty { len: usize },

    #[display("invalid catalog entry {name:?}: {reason}")]
    InvalidCatalogEntry { name: String, reason: String },

    #[display("malformed catalog: {source}")]
    CatalogFormat { source: serde_json::Error },

    #[display("i/o error: {source}")]
    Io { source: std::io::Error },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::CatalogFormat { source }
    }
}
