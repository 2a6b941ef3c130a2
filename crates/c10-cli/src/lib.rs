mod logging;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use c10_config::{ConfigError, ReindexConfig};
use c10_index::{reindex, verify_index, CopyMode, CopyReport, IndexSummary, ReindexError, VerifyError};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "c10",
    version,
    about = "Rebuild, strip and verify recording indices in Chapter 10 files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Copy a file, replacing its recording index.
    Reindex(ReindexArgs),
    /// Walk the trailing root index of a file.
    Verify(VerifyArgs),
    /// Print the JSON schema of the YAML config file.
    ConfigSchema,
}

#[derive(Debug, Args)]
pub struct ReindexArgs {
    pub src: PathBuf,
    pub dst: PathBuf,
    #[arg(short, long, help = "Strip existing index packets without writing new ones")]
    pub strip: bool,
    #[arg(short, long, help = "Overwrite an existing destination file")]
    pub force: bool,
    #[arg(long, help = "Optional path to c10 YAML config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    pub file: PathBuf,
    #[arg(long, help = "Optional path to c10 YAML config")]
    pub config: Option<PathBuf>,
}

/// What a successful command reports on stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Reindexed { mode: CopyMode, report: CopyReport },
    Verified(IndexSummary),
    Schema(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reindexed { mode, report } => {
                match mode {
                    CopyMode::StripOnly => write!(
                        f,
                        "Stripped existing indices: removed {} index packets, copied {} packets",
                        report.index_packets_dropped, report.packets_copied
                    )?,
                    CopyMode::Rebuild => write!(
                        f,
                        "Reindexed {} packets: wrote {} node and {} root index packets, \
                         removed {} stale index packets",
                        report.packets_copied,
                        report.nodes_written,
                        report.roots_written,
                        report.index_packets_dropped
                    )?,
                }
                if report.truncated_packets > 0 {
                    write!(f, " ({} truncated packets dropped)", report.truncated_packets)?;
                }
                Ok(())
            }
            Self::Verified(summary) => write!(
                f,
                "Index verified: {} root and {} node packets covering {} packets",
                summary.roots, summary.nodes, summary.entries
            ),
            Self::Schema(schema) => f.write_str(schema),
        }
    }
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let outcome = execute_command(cli.command)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{outcome}").map_err(|source| CliError::StdoutWrite { source })
}

pub fn execute_command(command: Command) -> Result<Outcome, CliError> {
    match command {
        Command::Reindex(args) => {
            let config = load_config(args.config.as_deref())?;
            logging::install(&config.logging);
            run_reindex(&args, &config)
        }
        Command::Verify(args) => {
            let config = load_config(args.config.as_deref())?;
            logging::install(&config.logging);
            run_verify(&args.file, &config)
        }
        Command::ConfigSchema => {
            let schema = serde_json::to_string_pretty(&c10_config::json_schema())?;
            Ok(Outcome::Schema(schema))
        }
    }
}

fn run_reindex(args: &ReindexArgs, config: &ReindexConfig) -> Result<Outcome, CliError> {
    preflight_destination(&args.src, &args.dst, args.force)?;

    let source = File::open(&args.src).map_err(|source| CliError::SourceOpen {
        path: args.src.display().to_string(),
        source,
    })?;
    let destination = File::create(&args.dst).map_err(|source| CliError::DestinationCreate {
        path: args.dst.display().to_string(),
        source,
    })?;

    let mode = if args.strip {
        CopyMode::StripOnly
    } else {
        CopyMode::Rebuild
    };
    info!(
        src = %args.src.display(),
        dst = %args.dst.display(),
        ?mode,
        "starting copy pass"
    );

    let (writer, report) = reindex(
        BufReader::new(source),
        BufWriter::new(destination),
        mode,
        config.reader_options(),
        config.limits.clone(),
    )?;
    let destination = writer
        .into_inner()
        .map_err(|error| CliError::DestinationWrite {
            path: args.dst.display().to_string(),
            source: error.into_error(),
        })?;
    destination
        .sync_all()
        .map_err(|source| CliError::DestinationWrite {
            path: args.dst.display().to_string(),
            source,
        })?;

    Ok(Outcome::Reindexed { mode, report })
}

fn run_verify(path: &Path, config: &ReindexConfig) -> Result<Outcome, CliError> {
    let file = File::open(path).map_err(|source| CliError::SourceOpen {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let summary =
        verify_index(&mut reader, config.reader_options()).map_err(|source| CliError::Verify {
            path: path.display().to_string(),
            source,
        })?;
    Ok(Outcome::Verified(summary))
}

/// Refuses to clobber an existing destination unless forced, and never lets
/// the destination alias the source.
fn preflight_destination(src: &Path, dst: &Path, force: bool) -> Result<(), CliError> {
    if !dst.exists() {
        return Ok(());
    }
    if !force {
        return Err(CliError::DestinationExists {
            path: dst.display().to_string(),
        });
    }
    if let (Ok(src), Ok(dst)) = (fs::canonicalize(src), fs::canonicalize(dst)) {
        if src == dst {
            return Err(CliError::SourceIsDestination {
                path: dst.display().to_string(),
            });
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ReindexConfig, CliError> {
    match path {
        Some(path) => Ok(ReindexConfig::load(path)?),
        None => Ok(ReindexConfig::default()),
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("destination file `{path}` already exists; use -f to overwrite")]
    DestinationExists { path: String },

    #[error("destination `{path}` is the source file")]
    SourceIsDestination { path: String },

    #[error("failed to open source file `{path}`: {source}")]
    SourceOpen { path: String, source: io::Error },

    #[error("failed to create destination file `{path}`: {source}")]
    DestinationCreate { path: String, source: io::Error },

    #[error("failed to write destination file `{path}`: {source}")]
    DestinationWrite { path: String, source: io::Error },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reindex(#[from] ReindexError),

    #[error("index verification failed for `{path}`: {source}")]
    Verify {
        path: String,
        #[source]
        source: VerifyError,
    },

    #[error("failed to render config schema: {0}")]
    SchemaRender(#[from] serde_json::Error),

    #[error("failed to write stdout: {source}")]
    StdoutWrite { source: io::Error },
}

impl CliError {
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        1
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use c10_index::{CopyMode, CopyReport, IndexSummary};
    use clap::Parser;

    use super::{execute_command, Cli, CliError, Command, Outcome, ReindexArgs};

    #[test]
    fn required_entrypoint_commands_parse() {
        assert!(Cli::try_parse_from(["c10", "reindex", "in.c10", "out.c10"]).is_ok());
        assert!(Cli::try_parse_from(["c10", "verify", "in.c10"]).is_ok());
        assert!(Cli::try_parse_from(["c10", "config-schema"]).is_ok());
        assert!(Cli::try_parse_from(["c10", "reindex", "in.c10"]).is_err());
    }

    #[test]
    fn reindex_flags_parse_short_and_long() {
        let cli = Cli::try_parse_from(["c10", "reindex", "a", "b", "-s", "--force"])
            .expect("flags should parse");
        let Command::Reindex(args) = cli.command else {
            panic!("expected reindex command");
        };
        assert!(args.strip);
        assert!(args.force);
        assert!(args.config.is_none());
    }

    #[test]
    fn existing_destination_is_refused_before_anything_is_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dst = dir.path().join("out.c10");
        fs::write(&dst, b"keep me").expect("seed destination");

        let error = execute_command(Command::Reindex(ReindexArgs {
            src: dir.path().join("missing.c10"),
            dst: dst.clone(),
            strip: false,
            force: false,
            config: None,
        }))
        .expect_err("destination exists");

        assert!(matches!(error, CliError::DestinationExists { .. }));
        assert_eq!(error.exit_code(), 1);
        assert_eq!(fs::read(&dst).expect("destination"), b"keep me");
    }

    #[test]
    fn forced_run_refuses_to_overwrite_its_own_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("same.c10");
        fs::write(&path, b"").expect("seed file");

        let error = execute_command(Command::Reindex(ReindexArgs {
            src: path.clone(),
            dst: path,
            strip: true,
            force: true,
            config: None,
        }))
        .expect_err("aliasing paths");
        assert!(matches!(error, CliError::SourceIsDestination { .. }));
    }

    #[test]
    fn missing_source_does_not_create_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dst = dir.path().join("out.c10");

        let error = execute_command(Command::Reindex(ReindexArgs {
            src: dir.path().join("missing.c10"),
            dst: dst.clone(),
            strip: false,
            force: false,
            config: None,
        }))
        .expect_err("missing source");

        assert!(matches!(error, CliError::SourceOpen { .. }));
        assert!(!dst.exists());
    }

    #[test]
    fn config_schema_command_renders_json() {
        let outcome = execute_command(Command::ConfigSchema).expect("schema");
        let Outcome::Schema(text) = outcome else {
            panic!("expected schema outcome");
        };
        assert!(text.contains("max_index_packet_bytes"));
    }

    #[test]
    fn summary_lines_are_single_line() {
        let report = CopyReport {
            packets_read: 12,
            packets_copied: 10,
            index_packets_dropped: 2,
            truncated_packets: 1,
            nodes_written: 3,
            roots_written: 1,
            bytes_written: 4096,
        };
        let strip = Outcome::Reindexed {
            mode: CopyMode::StripOnly,
            report: report.clone(),
        }
        .to_string();
        assert!(strip.starts_with("Stripped existing indices"));
        assert!(strip.ends_with("(1 truncated packets dropped)"));
        assert!(!strip.contains('\n'));

        let rebuild = Outcome::Reindexed {
            mode: CopyMode::Rebuild,
            report,
        }
        .to_string();
        assert!(rebuild.contains("3 node and 1 root"));

        let verified = Outcome::Verified(IndexSummary {
            roots: 1,
            nodes: 3,
            entries: 10,
        })
        .to_string();
        assert_eq!(
            verified,
            "Index verified: 1 root and 3 node packets covering 10 packets"
        );
    }
}
