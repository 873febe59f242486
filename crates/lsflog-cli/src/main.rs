use anyhow::Context;
use clap::{Parser, Subcommand};
use lsflog::{JobTable, LsfParser, ParseEvent, ParseSummary, ParserConfig, ProfileSelection};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

mod modulefile;

#[derive(Parser)]
#[command(name = "lsflog")]
#[command(about = "LSF job report tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an LSF job report log into a tab-separated stats table
    Parse {
        /// LSF job report log
        #[arg(value_name = "LOGFILE")]
        logfile: PathBuf,
        /// Destination of the per-job stats table
        #[arg(value_name = "LOGSTATS")]
        logstats: PathBuf,
        /// Also write `<jobID>\t<first output line>` per job to this file
        #[arg(long, value_name = "FILE")]
        outputs: Option<PathBuf>,
        /// Also dump the full records as JSON to this file
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
        /// Report layout: auto, legacy or current (overrides the config file)
        #[arg(long)]
        profile: Option<ProfileSelection>,
        /// JSON parser configuration
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Create or edit a lab modulefile
    AddModule(modulefile::AddModuleArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            logfile,
            logstats,
            outputs,
            json,
            profile,
            config,
        } => {
            let mut parser_config = match &config {
                Some(path) => ParserConfig::load_from_path(path)?,
                None => ParserConfig::default(),
            };
            if let Some(profile) = profile {
                parser_config.profile = profile;
            }

            let summary = run_parse(
                &parser_config,
                &logfile,
                &logstats,
                outputs.as_deref(),
                json.as_deref(),
            )?;
            log::info!(
                "{}: {} blocks, {} records, {} rejected, {} truncated",
                logfile.display(),
                summary.blocks,
                summary.records,
                summary.rejected,
                summary.truncated
            );
        }
        Commands::AddModule(args) => {
            modulefile::run(&args)?;
        }
    }
    Ok(())
}

/// Parses `logfile` and writes the stats table plus the optional listing and JSON dump.
fn run_parse(
    config: &ParserConfig,
    logfile: &Path,
    logstats: &Path,
    outputs: Option<&Path>,
    json: Option<&Path>,
) -> anyhow::Result<ParseSummary> {
    let file =
        File::open(logfile).with_context(|| format!("failed to open {}", logfile.display()))?;
    let events = LsfParser::with_config(config)
        .parse_reader(BufReader::new(file))
        .with_context(|| format!("failed to read {}", logfile.display()))?;
    let summary = ParseSummary::from_events(&events);
    let records: Vec<_> = events.into_iter().filter_map(ParseEvent::into_record).collect();

    let stats = File::create(logstats)
        .with_context(|| format!("failed to create {}", logstats.display()))?;
    JobTable::from_records(&records).write_tsv(BufWriter::new(stats))?;

    if let Some(path) = outputs {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        lsflog::write_output_listing(&records, BufWriter::new(file))?;
    }
    if let Some(path) = json {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        lsflog::write_json(&records, BufWriter::new(file))?;
    }
    Ok(summary)
}
