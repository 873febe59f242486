use crate::config::{ParserConfig, ProfileSelection};
use crate::ir::{FormatProfile, JobStatus, ParseEvent, ParseSummary};
use crate::LsfParser;

fn block(job_id: &str, host_line: &str, body: &str) -> String {
    format!(
        "Sender: LSF System <lsfadmin@cmu001>
Subject: Job {job_id}: <job{job_id}> in cluster <c> Done

Job <job{job_id}> was submitted from host <login1> by user <me> in cluster <c>.
{host_line}
</home/me> was used as the home directory.
</work> was used as the working directory.
Started at Mon Jan  4 10:00:00 2016
Results reported at Mon Jan  4 12:00:00 2016
{body}"
    )
}

const HOST_LINE: &str =
    "Job was executed on host(s) <cmu001>, in queue <short>, as user <me> in cluster <c>.";

const BODY: &str = "
Your job looked like:

------------------------------------------------------------
# LSBATCH: User input
./run.sh
------------------------------------------------------------

Successfully completed.

Resource usage summary:

    CPU time :                                   7.25 sec.
    Max Memory :                                 100 KB
    Max Swap :                                   200 KB
    Max Processes :                              1

The output (if any) follows:

started
finished
";

fn records(events: &[ParseEvent]) -> Vec<&crate::JobRecord> {
    events.iter().filter_map(ParseEvent::as_record).collect()
}

#[test]
fn test_parse_empty_log() {
    let parser = LsfParser::new();
    let result = parser.parse("");
    assert!(result.is_empty());
}

#[test]
fn test_text_without_marker_is_ignored() {
    let result = LsfParser::default().parse("Subject: Job 1: <x>\nnothing to see\n");
    assert!(result.is_empty());
}

#[test]
fn test_parse_single_block() {
    let events = LsfParser::new().parse(&block("100", HOST_LINE, BODY));
    assert_eq!(events.len(), 1);
    let record = events[0].as_record().unwrap();

    assert_eq!(record.job_id, "100");
    assert_eq!(record.job_name, "job100");
    assert_eq!(record.host, "cmu001");
    assert_eq!(record.queue, "short");
    assert_eq!(record.wall_time_seconds(), Some(7200));
    assert_eq!(record.wall_time_hours(), Some(2.0));
    assert_eq!(record.command, "./run.sh");
    assert_eq!(record.status, Some(JobStatus::Done));
    assert_eq!(record.exit_code, None);
    assert_eq!(record.cpu_seconds, 7.25);
    assert_eq!(record.max_mem_kb, 100);
    assert_eq!(record.max_swap_kb, 200);
    assert_eq!(record.output_lines, vec!["started", "finished"]);
    assert_eq!(record.output(), "started\nfinished");
    assert_eq!(record.profile, FormatProfile::Current);
    assert!(!record.truncated);
    assert_eq!(record.span.start, 1);
}

#[test]
fn test_bad_host_line_skips_only_that_block() {
    let log = [
        block("1", HOST_LINE, BODY),
        block("2", "Job was executed somewhere unknown.", BODY),
        block("3", HOST_LINE, BODY),
    ]
    .concat();
    let events = LsfParser::new().parse(&log);

    let ids: Vec<&str> = events
        .iter()
        .filter_map(ParseEvent::as_record)
        .map(|r| r.job_id.as_str())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);

    let diagnostic = events[1].as_diagnostic().unwrap();
    assert_eq!(diagnostic.job_id.as_deref(), Some("2"));
    assert!(diagnostic.message.contains("job 2"));

    let summary = ParseSummary::from_events(&events);
    assert_eq!(summary.blocks, 3);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.rejected, 1);
}

#[test]
fn test_exit_status_and_code() {
    let body = BODY.replace("Successfully completed.", "Exited with exit code 137.");
    let events = LsfParser::new().parse(&block("5", HOST_LINE, &body));
    let record = events[0].as_record().unwrap();
    assert_eq!(record.status, Some(JobStatus::Exit));
    assert_eq!(record.exit_code, Some(137));
}

#[test]
fn test_exit_by_signal_has_no_code() {
    let body = BODY.replace("Successfully completed.", "Exited with signal termination: Killed.");
    let events = LsfParser::new().parse(&block("6", HOST_LINE, &body));
    let record = events[0].as_record().unwrap();
    assert_eq!(record.status, Some(JobStatus::Exit));
    assert_eq!(record.exit_code, None);
}

#[test]
fn test_unparseable_memory_defaults_to_zero() {
    let body = BODY.replace("100 KB", "-");
    let events = LsfParser::new().parse(&block("7", HOST_LINE, &body));
    let record = events[0].as_record().unwrap();
    assert_eq!(record.max_mem_kb, 0);
    assert_eq!(record.max_swap_kb, 200);
}

#[test]
fn test_legacy_profile_from_config() {
    let config = ParserConfig::default().with_profile(ProfileSelection::Legacy);
    let events = LsfParser::with_config(&config).parse(&block("8", HOST_LINE, BODY));
    let record = events[0].as_record().unwrap();
    assert_eq!(record.profile, FormatProfile::Legacy);
    assert_eq!(record.status, None);
    assert_eq!(record.command, "./run.sh");
    assert_eq!(record.cpu_seconds, 7.25);
    assert_eq!(record.max_mem_kb, 100);
    assert_eq!(record.max_swap_kb, 200);
}

#[test]
fn test_legacy_keeps_record_with_unreadable_memory() {
    let config = ParserConfig::default().with_profile(ProfileSelection::Legacy);
    let body = BODY.replace("100 KB", "-");
    let events = LsfParser::with_config(&config).parse(&block("9", HOST_LINE, &body));
    let record = events[0].as_record().unwrap();
    assert_eq!(record.job_id, "9");
    assert_eq!(record.max_mem_kb, 0);
    assert_eq!(record.max_swap_kb, 200);
    assert_eq!(record.cpu_seconds, 7.25);
}

const USAGE: &str = "    Max Memory :                                 100 KB
    Max Swap :                                   200 KB
    Max Processes :                              1
";

// LSF 10 interleaves averages and requests with the peaks.
const LSF10_USAGE: &str = "    Max Memory :                                 100 MB
    Average Memory :                             5.00 MB
    Total Requested Memory :                     -
    Delta Memory :                               -
    Max Swap :                                   300 MB
    Max Processes :                              4
    Max Threads :                                9
    Run time :                                   7201 sec.
    Turnaround time :                            7205 sec.
";

#[test]
fn test_lsf10_usage_summary_reads_max_peaks() {
    let body = BODY.replace(USAGE, LSF10_USAGE);
    assert_ne!(body, BODY);
    let events = LsfParser::new().parse(&block("12", HOST_LINE, &body));
    let record = events[0].as_record().unwrap();
    assert_eq!(record.cpu_seconds, 7.25);
    assert_eq!(record.max_mem_kb, 102_400);
    assert_eq!(record.max_swap_kb, 307_200);
    assert!(!record.truncated);
    assert_eq!(record.output_lines, vec!["started", "finished"]);
}

#[test]
fn test_custom_block_marker() {
    let config = ParserConfig {
        block_marker: "From lsf".to_string(),
        ..ParserConfig::default()
    };
    let log = block("10", HOST_LINE, BODY).replace("Sender: LSF System", "From lsf");
    let events = LsfParser::with_config(&config).parse(&log);
    assert_eq!(records(&events).len(), 1);
}

#[test]
fn test_custom_output_intro() {
    let log = block("13", HOST_LINE, BODY).replace("The output (if any) follows:", "Job output:");

    let config = ParserConfig {
        output_intro: "Job output:".to_string(),
        ..ParserConfig::default()
    };
    let events = LsfParser::with_config(&config).parse(&log);
    assert_eq!(events[0].as_record().unwrap().output_lines, vec!["started", "finished"]);

    // Without the matching intro the captured lines stay in the header.
    let events = LsfParser::new().parse(&log);
    assert_eq!(events[0].as_record().unwrap().output_lines, vec![String::new()]);
}

#[test]
fn test_each_record_owns_its_output() {
    let log = [block("1", HOST_LINE, BODY), block("2", HOST_LINE, BODY)].concat();
    let events = LsfParser::new().parse(&log);
    let records = records(&events);
    assert_eq!(records[0].output_lines, vec!["started", "finished"]);
    assert_eq!(records[1].output_lines, vec!["started", "finished"]);
}

#[test]
fn test_events_serialize_with_kind_tag() {
    let events = LsfParser::new().parse(&block("11", HOST_LINE, BODY));
    let json = serde_json::to_value(&events).unwrap();
    assert_eq!(json[0]["kind"], "Record");
    assert_eq!(json[0]["data"]["job_id"], "11");
    assert_eq!(json[0]["data"]["profile"], "current");
}
