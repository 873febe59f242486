use crate::config::ParserConfig;
use crate::error::Result;
use crate::extract::Extractor;
use crate::ir::{Diagnostic, LineSpan, ParseEvent};
use crate::segment::{RawBlock, Segmenter};
use std::collections::VecDeque;
use std::io::BufRead;

/// A streaming parser for LSF job report logs.
///
/// `LsfParser` accepts log text incrementally or as a whole and emits one
/// [`ParseEvent`] per report block: either a finished record or a diagnostic for a
/// block that had to be discarded. Partial lines are held back until their newline
/// arrives.
pub struct LsfParser {
    segmenter: Segmenter,
    extractor: Extractor,
    buffer: String,
}

impl Default for LsfParser {
    /// Creates a parser for stock LSF output with profile auto-detection.
    fn default() -> Self {
        Self::new()
    }
}

impl LsfParser {
    pub fn new() -> Self {
        Self::with_config(&ParserConfig::default())
    }

    pub fn with_config(config: &ParserConfig) -> Self {
        Self {
            segmenter: Segmenter::new(config),
            extractor: Extractor::new(config.profile),
            buffer: String::new(),
        }
    }

    /// Appends input to the internal buffer and processes every complete line.
    ///
    /// # Returns
    ///
    /// Events for the blocks closed by this chunk. The block still being assembled is
    /// only reported once the next marker arrives or [`LsfParser::finish`] is called.
    pub fn update(&mut self, input: &str) -> Vec<ParseEvent> {
        self.buffer.push_str(input);
        let mut events = Vec::new();

        let Some(last_nl) = self.buffer.rfind('\n') else {
            return events; // No full lines yet
        };
        let chunk: String = self.buffer.drain(..=last_nl).collect();
        for line in chunk.lines() {
            self.push_line(line, &mut events);
        }
        events
    }

    /// Consumes the parser, processing any trailing partial line and flushing the
    /// last block, even if it never got past its marker.
    pub fn finish(mut self) -> Vec<ParseEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.push_line(&rest, &mut events);
        }
        if let Some(block) = self.segmenter.finish() {
            events.push(self.resolve(block));
        }
        events
    }

    /// Parses a whole log held in memory.
    pub fn parse(mut self, input: &str) -> Vec<ParseEvent> {
        let mut events = self.update(input);
        events.extend(self.finish());
        events
    }

    /// Pulls events lazily from a reader, one line at a time.
    ///
    /// Invalid UTF-8 is replaced rather than treated as an error; read failures are
    /// returned and end the iteration.
    pub fn events<R: BufRead>(self, reader: R) -> Events<R> {
        Events {
            parser: Some(self),
            reader,
            pending: VecDeque::new(),
            line: Vec::new(),
        }
    }

    /// Parses everything a reader yields. Stops at the first I/O error.
    pub fn parse_reader<R: BufRead>(self, reader: R) -> Result<Vec<ParseEvent>> {
        self.events(reader).collect()
    }

    fn push_line(&mut self, line: &str, events: &mut Vec<ParseEvent>) {
        if let Some(block) = self.segmenter.push_line(line) {
            events.push(self.resolve(block));
        }
    }

    fn resolve(&self, block: RawBlock) -> ParseEvent {
        let span = LineSpan::new(block.start_line, block.end_line);
        match self.extractor.extract(block) {
            Ok(record) => {
                if record.is_degenerate() {
                    log::warn!(
                        "lines {}-{}: input ends right after a block marker, emitting an empty record",
                        span.start,
                        span.end
                    );
                } else if record.truncated {
                    log::warn!("job {}: report truncated at end of input", record.job_id);
                }
                ParseEvent::Record(record)
            }
            Err(e) => {
                log::warn!("lines {}-{}: {}, block skipped", span.start, span.end, e);
                ParseEvent::Rejected(Diagnostic {
                    message: e.to_string(),
                    job_id: e.job_id().map(str::to_string),
                    span,
                })
            }
        }
    }
}

/// Pull-based event stream over a reader. See [`LsfParser::events`].
pub struct Events<R> {
    parser: Option<LsfParser>,
    reader: R,
    pending: VecDeque<ParseEvent>,
    line: Vec<u8>,
}

impl<R: BufRead> Iterator for Events<R> {
    type Item = Result<ParseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            let parser = self.parser.as_mut()?;

            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    let parser = self.parser.take()?;
                    self.pending.extend(parser.finish());
                }
                Ok(_) => {
                    let text = String::from_utf8_lossy(&self.line);
                    let line = text.strip_suffix('\n').unwrap_or(&text);
                    let mut events = Vec::new();
                    parser.push_line(line, &mut events);
                    self.pending.extend(events);
                }
                Err(e) => {
                    self.parser = None;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}
