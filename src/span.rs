/// A byte range in one source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file_id: u16,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    /// A span that points nowhere. Synthesized code carries it so that
    /// diagnostics never land on a made-up location.
    pub fn dummy() -> Self {
        Self::default()
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}
