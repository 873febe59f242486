use crate::error::Result;
use crate::ir::{JobRecord, JobStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header of the stats table, in column order.
pub const STATS_COLUMNS: [&str; 14] = [
    "jobID",
    "jobname",
    "host",
    "queue",
    "start",
    "end",
    "walltime",
    "status",
    "exit_code",
    "cpu",
    "mem",
    "swap",
    "command",
    "walltime_hr",
];

/// Scalar fields of one record, as written to the stats table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRow {
    pub job_id: String,
    pub job_name: String,
    pub host: String,
    pub queue: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub walltime: Option<i64>,
    pub status: Option<JobStatus>,
    pub exit_code: Option<i32>,
    pub cpu: f64,
    pub mem: u64,
    pub swap: u64,
    pub command: String,
    pub walltime_hr: Option<f64>,
}

impl From<&JobRecord> for JobRow {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.job_id.clone(),
            job_name: record.job_name.clone(),
            host: record.host.clone(),
            queue: record.queue.clone(),
            start: record
                .start_time
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
            end: record
                .end_time
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
            walltime: record.wall_time_seconds(),
            status: record.status,
            exit_code: record.exit_code,
            cpu: record.cpu_seconds,
            mem: record.max_mem_kb,
            swap: record.max_swap_kb,
            command: record.command.clone(),
            walltime_hr: record.wall_time_hours(),
        }
    }
}

/// Per-job stats keyed by job ID.
///
/// Rows keep the order in which their ID was first seen. Re-inserting an ID
/// replaces that row's values.
#[derive(Debug, Clone, Default)]
pub struct JobTable {
    rows: Vec<JobRow>,
    index: HashMap<String, usize>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a JobRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn insert(&mut self, record: &JobRecord) {
        let row = JobRow::from(record);
        match self.index.get(&row.job_id) {
            Some(&pos) => {
                log::warn!("job {} reported more than once, keeping the last report", row.job_id);
                self.rows[pos] = row;
            }
            None => {
                self.index.insert(row.job_id.clone(), self.rows.len());
                self.rows.push(row);
            }
        }
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRow> {
        self.index.get(job_id).map(|&pos| &self.rows[pos])
    }

    pub fn rows(&self) -> &[JobRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the table as tab-separated text with a header row.
    ///
    /// Unknown values are written as empty cells.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(STATS_COLUMNS)?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Writes one line per record, in parse order: the job ID padded to a fixed width,
/// a tab, then the first captured output line.
pub fn write_output_listing<'a, W: Write>(
    records: impl IntoIterator<Item = &'a JobRecord>,
    mut writer: W,
) -> Result<()> {
    for record in records {
        writeln!(writer, "{:<12}\t{}", record.job_id, record.first_output_line())?;
    }
    writer.flush()?;
    Ok(())
}

/// Dumps full records, command and output included, as pretty JSON.
pub fn write_json<W: Write>(records: &[JobRecord], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
