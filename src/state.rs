use crate::buffer::StreamBuffer;

#[derive(Debug)]
pub(crate) struct MultipartState<'r> {
    pub(crate) buffer: StreamBuffer<'r>,
    pub(crate) stage: StreamingStage,
    /// Bumped whenever the iterator leaves a field; a reader minted under an
    /// older value is superseded.
    pub(crate) generation: u64,
    pub(crate) next_field_idx: usize,
    pub(crate) curr_field_name: Option<String>,
    pub(crate) max_header_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamingStage {
    FindingFirstBoundary,
    ReadingBoundary,
    ReadingFieldData,
    Failed,
}

impl MultipartState<'_> {
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}
