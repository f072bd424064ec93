use thiserror::Error;

/// Decoder error types.
///
/// Every variant is an integrity violation: the input buffer is corrupt or
/// truncated and no partial model is produced.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A computed byte range runs past the end of the buffer
    #[error("{what}: {len:#x} bytes at {offset:#x} exceed buffer length {buffer_len:#x}")]
    Truncated {
        what: &'static str,
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    /// The consumed sections do not close the buffer exactly
    #[error("{format} buffer length mismatch: sections end at {expected:#x}, buffer is {actual:#x} bytes")]
    LengthMismatch {
        format: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Concatenated animation streams disagree on the per-frame vertex count
    #[error("animation buffer {index} declares {actual} vertices, expected {expected}")]
    VertexCountMismatch {
        index: usize,
        expected: u16,
        actual: u16,
    },

    /// A polygon corner points at a position slot that does not exist
    #[error("polygon {polygon} references vertex {index}, but only {vertex_count} vertices exist")]
    VertexIndexOutOfRange {
        polygon: usize,
        index: u16,
        vertex_count: u16,
    },

    /// A fixed-size record failed to parse after its bounds were checked
    #[error("failed to read {what}")]
    Record {
        what: &'static str,
        #[source]
        source: binrw::Error,
    },
}

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecodeError>;
