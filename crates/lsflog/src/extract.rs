use crate::config::ProfileSelection;
use crate::ir::{FormatProfile, JobRecord, JobStatus, LineSpan};
use crate::segment::{BlockEnd, RawBlock, is_separator};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static JOB_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Job (\d+(?:\[\d+\])?):").expect("job id pattern"));
static JOB_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([^>]*)>").expect("job name pattern"));
// Multi-slot placements are printed as `<4*cmu065>`.
static HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"host\(s\) <(?:\d+\*)?([A-Za-z][A-Za-z0-9._-]*)>").expect("host pattern")
});
static QUEUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"queue <([A-Za-z0-9._-]+)>").expect("queue pattern"));
static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.\d+)").expect("decimal pattern"));
static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*([KMGT]B)?").expect("amount pattern")
});
static EXIT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Exited with exit code (-?\d+)").expect("exit code pattern"));

const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";
const SUCCESS_LINE: &str = "Successfully completed";
const EXIT_LINE: &str = "Exited with";
const LSBATCH_PREFIX: &str = "# LSBATCH:";
const MAX_MEMORY_LABEL: &str = "Max Memory";
const MAX_SWAP_LABEL: &str = "Max Swap";

// Line offsets, each relative to the line of the previous field.
const PLACEMENT_AFTER_SUBJECT: usize = 3;
const START_AFTER_PLACEMENT: usize = 3;
const LEGACY_COMMAND_AFTER_END: usize = 6;
const LEGACY_CPU_AFTER_COMMAND: usize = 7;

/// Why a block produced no record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("malformed block: no job ID in subject line")]
    MissingJobId,
    #[error("job {job_id}: execution host not found")]
    MissingHost { job_id: String },
    #[error("job {job_id}: queue not found")]
    MissingQueue { job_id: String },
    #[error("job {job_id}: {field} line does not match the legacy layout")]
    LegacyField { job_id: String, field: &'static str },
}

impl ExtractError {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            ExtractError::MissingJobId => None,
            ExtractError::MissingHost { job_id }
            | ExtractError::MissingQueue { job_id }
            | ExtractError::LegacyField { job_id, .. } => Some(job_id),
        }
    }
}

/// Fields in the order they are read from a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Subject,
    Placement,
    Times,
    Command,
    Status,
    Cpu,
    Memory,
}

/// Picks the profile for a block: the current layout always carries a status line.
pub fn detect_profile(header: &[String]) -> FormatProfile {
    let has_status = header.iter().any(|line| {
        let line = line.trim_start();
        line.starts_with(SUCCESS_LINE) || line.starts_with(EXIT_LINE)
    });
    if has_status {
        FormatProfile::Current
    } else {
        FormatProfile::Legacy
    }
}

/// Turns report blocks into [`JobRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    selection: ProfileSelection,
}

impl Extractor {
    pub fn new(selection: ProfileSelection) -> Self {
        Self { selection }
    }

    /// Extracts one record from `block`.
    ///
    /// Only a missing job ID, host or queue discards the block, plus an unreadable
    /// CPU time in the legacy layout. Other fields fall back to their defaults. A
    /// block cut short by end of input is still returned, flagged `truncated`.
    pub fn extract(&self, block: RawBlock) -> Result<JobRecord, ExtractError> {
        let profile = self
            .selection
            .fixed()
            .unwrap_or_else(|| detect_profile(&block.header));
        let mut record = JobRecord::new(profile, LineSpan::new(block.start_line, block.end_line));

        let reached = match profile {
            FormatProfile::Legacy => extract_legacy(&block.header, &mut record)?,
            FormatProfile::Current => extract_current(&block.header, &mut record)?,
        };
        if let Some(stage) = reached {
            ran_out(&mut record, stage, block.end)?;
        }

        record.output_lines = block.output;
        if record.output_lines.is_empty() {
            record.output_lines.push(String::new());
        }
        Ok(record)
    }
}

/// Handles a block whose header ended before `stage` could be read.
fn ran_out(record: &mut JobRecord, stage: Stage, end: BlockEnd) -> Result<(), ExtractError> {
    match end {
        BlockEnd::Eof => {
            record.truncated = true;
            Ok(())
        }
        BlockEnd::Marker if stage == Stage::Subject => Err(ExtractError::MissingJobId),
        BlockEnd::Marker if stage == Stage::Placement => Err(ExtractError::MissingHost {
            job_id: record.job_id.clone(),
        }),
        BlockEnd::Marker => {
            log::debug!(
                "job {}: report ends before {:?}, keeping defaults",
                record.job_id,
                stage
            );
            Ok(())
        }
    }
}

/// How far the positional walk over a header got.
enum Progress {
    /// All fields up to here were read; the last one sits on this line index.
    At(usize),
    /// The header ended before this field's line.
    RanOut(Stage),
}

/// Reads the fields both profiles share: subject, placement and timestamps.
fn extract_common(lines: &[String], record: &mut JobRecord) -> Result<Progress, ExtractError> {
    let Some(subject) = lines.first() else {
        return Ok(Progress::RanOut(Stage::Subject));
    };
    let job_id = JOB_ID_RE
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .ok_or(ExtractError::MissingJobId)?;
    record.job_id = job_id.as_str().to_string();
    record.job_name = JOB_NAME_RE
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
        .unwrap_or_default();

    let placement_idx = PLACEMENT_AFTER_SUBJECT;
    let Some(placement) = lines.get(placement_idx) else {
        return Ok(Progress::RanOut(Stage::Placement));
    };
    record.host = HOST_RE
        .captures(placement)
        .and_then(|caps| caps.get(1))
        .map(|host| host.as_str().to_string())
        .ok_or_else(|| ExtractError::MissingHost {
            job_id: record.job_id.clone(),
        })?;
    record.queue = QUEUE_RE
        .captures(placement)
        .and_then(|caps| caps.get(1))
        .map(|queue| queue.as_str().to_string())
        .ok_or_else(|| ExtractError::MissingQueue {
            job_id: record.job_id.clone(),
        })?;

    let start_idx = placement_idx + START_AFTER_PLACEMENT;
    let end_idx = start_idx + 1;
    record.start_time = lines.get(start_idx).and_then(|line| parse_timestamp(line));
    let Some(end_line) = lines.get(end_idx) else {
        return Ok(Progress::RanOut(Stage::Times));
    };
    record.end_time = parse_timestamp(end_line);
    if let (Some(start), Some(end)) = (record.start_time, record.end_time)
        && end < start
    {
        log::warn!(
            "job {}: end time {} precedes start time {}, wall time clamped to 0",
            record.job_id,
            end,
            start
        );
    }
    Ok(Progress::At(end_idx))
}

/// Fixed offsets throughout. An unreadable CPU time discards the block; unreadable
/// memory and swap peaks default to zero.
fn extract_legacy(lines: &[String], record: &mut JobRecord) -> Result<Option<Stage>, ExtractError> {
    let end_idx = match extract_common(lines, record)? {
        Progress::At(idx) => idx,
        Progress::RanOut(stage) => return Ok(Some(stage)),
    };

    let command_idx = end_idx + LEGACY_COMMAND_AFTER_END;
    let Some(command) = lines.get(command_idx) else {
        return Ok(Some(Stage::Command));
    };
    record.command = command.trim().to_string();

    let cpu_idx = command_idx + LEGACY_CPU_AFTER_COMMAND;
    let Some(cpu_line) = lines.get(cpu_idx) else {
        return Ok(Some(Stage::Cpu));
    };
    record.cpu_seconds = parse_decimal(cpu_line).ok_or_else(|| legacy_error(record, "CPU time"))?;

    let Some(mem_line) = lines.get(cpu_idx + 1) else {
        return Ok(Some(Stage::Memory));
    };
    record.max_mem_kb = soft_kilobytes(record, "memory", mem_line);
    let Some(swap_line) = lines.get(cpu_idx + 2) else {
        return Ok(Some(Stage::Memory));
    };
    record.max_swap_kb = soft_kilobytes(record, "swap", swap_line);
    Ok(None)
}

fn legacy_error(record: &JobRecord, field: &'static str) -> ExtractError {
    ExtractError::LegacyField {
        job_id: record.job_id.clone(),
        field,
    }
}

/// Relative scanning with soft defaults for everything after the placement line.
fn extract_current(lines: &[String], record: &mut JobRecord) -> Result<Option<Stage>, ExtractError> {
    let end_idx = match extract_common(lines, record)? {
        Progress::At(idx) => idx,
        Progress::RanOut(stage) => return Ok(Some(stage)),
    };

    let Some(open_idx) = find_from(lines, end_idx + 1, is_separator) else {
        return Ok(Some(Stage::Command));
    };
    let mut idx = open_idx + 1;
    if lines
        .get(idx)
        .is_some_and(|line| line.trim_start().starts_with(LSBATCH_PREFIX))
    {
        idx += 1;
    }
    let mut fragments = Vec::new();
    let close_idx = loop {
        match lines.get(idx) {
            None => {
                record.command = fragments.join(" ");
                return Ok(Some(Stage::Command));
            }
            Some(line) if is_separator(line) => break idx,
            Some(line) => {
                let fragment = line.trim();
                if !fragment.is_empty() {
                    fragments.push(fragment);
                }
                idx += 1;
            }
        }
    };
    record.command = fragments.join(" ");

    let Some(status_idx) = find_from(lines, close_idx + 1, |line| !line.trim().is_empty()) else {
        return Ok(Some(Stage::Status));
    };
    if lines[status_idx].trim_start().starts_with(SUCCESS_LINE) {
        record.status = Some(JobStatus::Done);
    } else {
        // Termination reasons such as `TERM_MEMLIMIT: ...` may precede the exit line.
        record.status = Some(JobStatus::Exit);
        record.exit_code = lines[status_idx..]
            .iter()
            .take_while(|line| !line.trim().is_empty())
            .find_map(|line| EXIT_CODE_RE.captures(line)?[1].parse().ok());
    }

    let Some(cpu_idx) = find_from(lines, status_idx + 1, |line| DECIMAL_RE.is_match(line)) else {
        log::debug!("job {}: no CPU time line, defaulting to 0", record.job_id);
        return Ok(Some(Stage::Cpu));
    };
    record.cpu_seconds = parse_decimal(&lines[cpu_idx]).unwrap_or_default();

    // The usage summary runs from the CPU line to the next blank line.
    let (mut seen_mem, mut seen_swap, mut closed) = (false, false, false);
    for (position, line) in lines.iter().skip(cpu_idx + 1).enumerate() {
        if line.trim().is_empty() {
            closed = true;
            break;
        }
        match resource_slot(line, position) {
            Some(ResourceSlot::Memory) if !seen_mem => {
                seen_mem = true;
                record.max_mem_kb = soft_kilobytes(record, "memory", line);
            }
            Some(ResourceSlot::Swap) if !seen_swap => {
                seen_swap = true;
                record.max_swap_kb = soft_kilobytes(record, "swap", line);
            }
            _ => {}
        }
    }
    if seen_mem && seen_swap {
        return Ok(None);
    }
    if !closed {
        return Ok(Some(Stage::Memory));
    }
    log::debug!(
        "job {}: usage summary lacks a {} peak, defaulting to 0",
        record.job_id,
        if seen_mem { "swap" } else { "memory" }
    );
    Ok(None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceSlot {
    Memory,
    Swap,
}

/// Decides which peak a line of the usage summary reports.
///
/// Labelled lines count only under the exact `Max Memory` / `Max Swap` labels, so
/// LSF 10 counters such as `Average Memory` are skipped and a dropped memory line
/// never shifts the swap value into memory. Unlabelled lines go by position.
fn resource_slot(line: &str, position: usize) -> Option<ResourceSlot> {
    match line.split_once(':') {
        Some((label, _)) => match label.trim() {
            MAX_MEMORY_LABEL => Some(ResourceSlot::Memory),
            MAX_SWAP_LABEL => Some(ResourceSlot::Swap),
            _ => None,
        },
        None if line.trim().is_empty() => None,
        None => match position {
            0 => Some(ResourceSlot::Memory),
            1 => Some(ResourceSlot::Swap),
            _ => None,
        },
    }
}

fn soft_kilobytes(record: &JobRecord, field: &str, line: &str) -> u64 {
    parse_kilobytes(line).unwrap_or_else(|| {
        log::debug!(
            "job {}: unreadable {} line {:?}, defaulting to 0",
            record.job_id,
            field,
            line.trim()
        );
        0
    })
}

fn find_from(lines: &[String], from: usize, pred: impl Fn(&str) -> bool) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, line)| pred(line.as_str()))
        .map(|(idx, _)| idx)
}

/// Parses the date after ` at ` in lines such as `Started at Mon Jan  4 10:00:00 2016`.
pub fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
    let (_, text) = line.trim().split_once(" at ")?;
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match NaiveDateTime::parse_from_str(&normalized, DATE_FORMAT) {
        Ok(timestamp) => Some(timestamp),
        Err(e) => {
            log::debug!("unparseable timestamp {:?}: {}", normalized, e);
            None
        }
    }
}

fn parse_decimal(line: &str) -> Option<f64> {
    DECIMAL_RE.captures(line)?[1].parse().ok()
}

/// Reads the first number on the line as kilobytes, honouring a `KB`/`MB`/`GB`/`TB` unit.
pub fn parse_kilobytes(line: &str) -> Option<u64> {
    let caps = AMOUNT_RE.captures(line)?;
    let value: f64 = caps[1].parse().ok()?;
    let scale = match caps.get(2).map(|unit| unit.as_str()) {
        Some("MB") => 1024.0,
        Some("GB") => 1024.0 * 1024.0,
        Some("TB") => 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    };
    Some((value * scale).round() as u64)
}
