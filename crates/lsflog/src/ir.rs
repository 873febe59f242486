use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 1-based, inclusive range of input lines covered by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Completion state reported after the command section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Done,
    Exit,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Done => "DONE",
            JobStatus::Exit => "EXIT",
        }
    }
}

/// Layout variant of an LSF report block.
///
/// `Legacy` reads every field from a fixed line offset and has no status line.
/// `Current` adds the status line, rebuilds wrapped commands, scans for the CPU
/// line and falls back to zero for unreadable memory and swap peaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatProfile {
    Legacy,
    #[default]
    Current,
}

/// One parsed job report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub job_name: String,
    pub host: String,
    pub queue: String,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub command: String,
    pub status: Option<JobStatus>,
    pub exit_code: Option<i32>,
    pub cpu_seconds: f64,
    pub max_mem_kb: u64,
    pub max_swap_kb: u64,
    pub output_lines: Vec<String>,
    pub profile: FormatProfile,
    pub span: LineSpan,
    /// The input ended before this record's header was complete.
    pub truncated: bool,
}

impl JobRecord {
    /// Creates an empty record for a block starting at `span.start`.
    ///
    /// Every record owns its own output buffer; nothing is shared between records.
    pub fn new(profile: FormatProfile, span: LineSpan) -> Self {
        Self {
            job_id: String::new(),
            job_name: String::new(),
            host: String::new(),
            queue: String::new(),
            start_time: None,
            end_time: None,
            command: String::new(),
            status: None,
            exit_code: None,
            cpu_seconds: 0.0,
            max_mem_kb: 0,
            max_swap_kb: 0,
            output_lines: Vec::new(),
            profile,
            span,
            truncated: false,
        }
    }

    /// Seconds between the start and end timestamps, never negative.
    ///
    /// `None` when either timestamp is unknown.
    pub fn wall_time_seconds(&self) -> Option<i64> {
        let (start, end) = (self.start_time?, self.end_time?);
        Some(end.signed_duration_since(start).num_seconds().max(0))
    }

    pub fn wall_time_hours(&self) -> Option<f64> {
        self.wall_time_seconds().map(|secs| secs as f64 / 3600.0)
    }

    /// The captured output joined back into one string.
    pub fn output(&self) -> String {
        self.output_lines.join("\n")
    }

    pub fn first_output_line(&self) -> &str {
        self.output_lines.first().map(String::as_str).unwrap_or("")
    }

    /// A record flushed at end of input before even its subject line was read.
    ///
    /// These are still emitted; callers that only want real jobs can filter on this.
    pub fn is_degenerate(&self) -> bool {
        self.truncated && self.job_id.is_empty()
    }
}

/// Operator-facing notice about a block that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub span: LineSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum ParseEvent {
    Record(JobRecord),
    Rejected(Diagnostic),
}

impl ParseEvent {
    pub fn as_record(&self) -> Option<&JobRecord> {
        match self {
            ParseEvent::Record(record) => Some(record),
            ParseEvent::Rejected(_) => None,
        }
    }

    pub fn into_record(self) -> Option<JobRecord> {
        match self {
            ParseEvent::Record(record) => Some(record),
            ParseEvent::Rejected(_) => None,
        }
    }

    pub fn as_diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseEvent::Rejected(diagnostic) => Some(diagnostic),
            ParseEvent::Record(_) => None,
        }
    }
}

/// Counts over one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseSummary {
    /// Block-start markers seen.
    pub blocks: usize,
    pub records: usize,
    pub rejected: usize,
    pub truncated: usize,
}

impl ParseSummary {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a ParseEvent>) -> Self {
        let mut summary = Self::default();
        for event in events {
            summary.blocks += 1;
            match event {
                ParseEvent::Record(record) => {
                    summary.records += 1;
                    if record.truncated {
                        summary.truncated += 1;
                    }
                }
                ParseEvent::Rejected(_) => summary.rejected += 1,
            }
        }
        summary
    }
}
