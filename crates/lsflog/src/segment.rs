use crate::config::ParserConfig;

/// Returns true for a row of dashes, which fences the command section.
pub fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.bytes().all(|b| b == b'-')
}

/// Where the segmenter is inside the current report block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Before the first block-start marker; lines are ignored.
    AwaitingBlock,
    InHeader,
    /// Between the two dash separators. The output intro is not recognised here.
    InCommand,
    /// After the output intro. `leading` is set until the first line after the intro.
    InOutput { leading: bool },
}

/// How a block was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEnd {
    /// The next block-start marker was seen.
    Marker,
    /// The input ran out.
    Eof,
}

/// The lines of one report block, split into header and captured output.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    /// Line number of the block-start marker.
    pub start_line: usize,
    /// Line number of the last line belonging to the block.
    pub end_line: usize,
    /// Lines after the marker, up to the output intro.
    pub header: Vec<String>,
    /// Captured output, whitespace-trimmed.
    pub output: Vec<String>,
    pub end: BlockEnd,
}

impl RawBlock {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            end_line: start_line,
            header: Vec::new(),
            output: Vec::new(),
            end: BlockEnd::Eof,
        }
    }
}

/// Splits a line stream into report blocks.
///
/// Lines are pushed one at a time; a finished block is handed back as soon as the
/// marker of the next one arrives. Call [`Segmenter::finish`] at end of input to
/// flush the block still being assembled.
#[derive(Debug)]
pub struct Segmenter {
    block_marker: String,
    output_intro: String,
    state: SegmentState,
    current: Option<RawBlock>,
    line_no: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(&ParserConfig::default())
    }
}

impl Segmenter {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            block_marker: config.block_marker.clone(),
            output_intro: config.output_intro.clone(),
            state: SegmentState::AwaitingBlock,
            current: None,
            line_no: 0,
        }
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// Number of lines consumed so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Feeds one line (without its terminator). Returns the previous block when
    /// `line` starts a new one.
    pub fn push_line(&mut self, line: &str) -> Option<RawBlock> {
        self.line_no += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.starts_with(self.block_marker.as_str()) {
            let finished = self.close(BlockEnd::Marker);
            self.current = Some(RawBlock::new(self.line_no));
            self.state = SegmentState::InHeader;
            return finished;
        }

        let line_no = self.line_no;
        let Some(block) = self.current.as_mut() else {
            return None;
        };
        block.end_line = line_no;

        self.state = match self.state {
            SegmentState::AwaitingBlock => SegmentState::AwaitingBlock,
            SegmentState::InHeader if line.trim_end() == self.output_intro => {
                SegmentState::InOutput { leading: true }
            }
            SegmentState::InHeader => {
                block.header.push(line.to_string());
                if is_separator(line) {
                    SegmentState::InCommand
                } else {
                    SegmentState::InHeader
                }
            }
            SegmentState::InCommand => {
                block.header.push(line.to_string());
                if is_separator(line) {
                    SegmentState::InHeader
                } else {
                    SegmentState::InCommand
                }
            }
            SegmentState::InOutput { leading } => {
                // LSF puts one blank line between the intro and the output.
                if !(leading && line.trim().is_empty()) {
                    block.output.push(line.trim().to_string());
                }
                SegmentState::InOutput { leading: false }
            }
        };
        None
    }

    /// Flushes the in-progress block at end of input.
    pub fn finish(&mut self) -> Option<RawBlock> {
        self.close(BlockEnd::Eof)
    }

    fn close(&mut self, end: BlockEnd) -> Option<RawBlock> {
        self.state = SegmentState::AwaitingBlock;
        let mut block = self.current.take()?;
        block.end = end;
        Some(block)
    }
}
