//! Flowcheck - Flowmon appliance verification suite
//!
//! The main entry point for fc-core, handling:
//! - Collector daemon IO priority verification
//! - Remote-storage configuration verification
//! - End-to-end share round-trips, single or full matrix
//!
//! Check reports go to stdout in the selected format; logs go to stderr.

use clap::{Args, Parser, Subcommand};
use fc_common::OutputFormat;
use fc_core::exit_codes::ExitCode;
use fc_core::ioprio::{self, IoPriorityReport};
use fc_core::logging::init_logging;
use fc_core::samba::config::{DEFAULT_LOGIN, DEFAULT_PASSWORD};
use fc_core::samba::{
    self, roundtrip, verify_backend, AuthMode, Credentials, MatrixOutcome, ProtocolVersion,
    RoundTripError, SambaConfig,
};
use fc_remote::exec::Runner;
use fc_remote::ssh::{SshConfig, SshRunner};

/// Flowcheck - appliance IO priority and remote-storage verification
#[derive(Parser)]
#[command(name = "fc-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Appliance hostname or address
    #[arg(long, global = true, env = "FC_HOST")]
    host: Option<String>,

    /// SSH user on the appliance
    #[arg(long, global = true, env = "FC_SSH_USER")]
    user: Option<String>,

    /// SSH identity file
    #[arg(long, global = true, env = "FC_IDENTITY")]
    identity: Option<String>,

    /// SSH port on the appliance
    #[arg(long, global = true)]
    ssh_port: Option<u16>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify collector daemon IO priorities
    IoPriority,

    /// Apply a remote-storage configuration and verify backend artifacts
    Samba(ShareOpts),

    /// Full share round-trip: configure, upload, cycle the service, read back
    RoundTrip(RoundTripOpts),

    /// Run every check: IO priority plus the full round-trip matrix
    All(ShareOpts),
}

/// Share configuration under test
#[derive(Args, Debug)]
struct ShareOpts {
    /// Share server address
    #[arg(long, env = "FC_SHARE_IP")]
    ip: String,

    /// SMB dialect
    #[arg(long, default_value = "3.0")]
    protocol_version: ProtocolVersion,

    /// Authentication mode
    #[arg(long, default_value = "ntlmv2")]
    auth: AuthMode,

    /// Share port
    #[arg(long, default_value_t = 445)]
    port: u16,

    /// Directory on the share
    #[arg(long, default_value = "share")]
    root: String,

    /// Authentication domain
    #[arg(long, default_value = "WORKGROUP")]
    domain: String,

    /// Share account login
    #[arg(long)]
    login: Option<String>,

    /// Share account password
    #[arg(long)]
    password: Option<String>,

    /// Disable authentication (no credentials in the document)
    #[arg(long)]
    anonymous: bool,
}

impl ShareOpts {
    fn to_config(&self) -> SambaConfig {
        let mut config = SambaConfig::for_share(self.ip.clone()).with_combination(
            self.protocol_version,
            self.auth,
            self.port,
        );
        config.root = self.root.clone();
        config.domain = self.domain.clone();
        config.credentials = if self.anonymous {
            None
        } else {
            Some(Credentials {
                login: self.login.clone().unwrap_or_else(|| DEFAULT_LOGIN.to_string()),
                password: self
                    .password
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            })
        };
        config
    }
}

#[derive(Args, Debug)]
struct RoundTripOpts {
    #[command(flatten)]
    share: ShareOpts,

    /// Run every (version, auth, port) combination in both auth modes
    #[arg(long)]
    matrix: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet);
    run(cli).exit();
}

fn run(cli: Cli) -> ExitCode {
    let Some(ref host) = cli.global.host else {
        eprintln!("error: no appliance host given (use --host or FC_HOST)");
        return ExitCode::ArgsError;
    };

    let ssh = SshConfig {
        user: cli.global.user.clone(),
        identity_file: cli.global.identity.clone(),
        port: cli.global.ssh_port,
        ..SshConfig::default()
    };
    let runner = SshRunner::new(host.clone(), ssh);

    match cli.command {
        Commands::IoPriority => cmd_io_priority(&runner, cli.global.format),
        Commands::Samba(ref opts) => cmd_samba(&runner, opts, cli.global.format),
        Commands::RoundTrip(ref opts) => cmd_round_trip(&runner, opts, cli.global.format),
        Commands::All(ref opts) => cmd_all(&runner, opts, cli.global.format),
    }
}

fn cmd_all(runner: &dyn Runner, opts: &ShareOpts, format: OutputFormat) -> ExitCode {
    let io_code = cmd_io_priority(runner, format);

    let outcome = samba::run_matrix(runner, &opts.to_config());
    render_matrix(&outcome, format);
    let rt_code = if outcome.failed == 0 {
        ExitCode::Clean
    } else {
        ExitCode::CheckFailed
    };

    // Report the worse of the two outcomes
    if i32::from(io_code) >= i32::from(rt_code) {
        io_code
    } else {
        rt_code
    }
}

fn cmd_io_priority(runner: &dyn Runner, format: OutputFormat) -> ExitCode {
    match ioprio::run_check(runner) {
        Ok(reports) => {
            render_io_reports(&reports, format);
            ExitCode::Clean
        }
        Err(e) => report_failure(e.into(), format),
    }
}

/// Print a failure in the selected format and map it to an exit code.
fn report_failure(e: fc_common::Error, format: OutputFormat) -> ExitCode {
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "code": e.code(),
                "category": e.category(),
                "message": e.to_string(),
            });
            eprintln!("{}", body);
        }
        _ => eprintln!("error[{}]: {}", e.category(), e),
    }

    match e {
        fc_common::Error::ConnectionFailed { .. } | fc_common::Error::ExecTimeout { .. } => {
            ExitCode::ConnectionError
        }
        fc_common::Error::Precondition(_) => ExitCode::PreconditionFailed,
        fc_common::Error::Exec(_) | fc_common::Error::Io(_) | fc_common::Error::Json(_) => {
            ExitCode::InternalError
        }
        _ => ExitCode::CheckFailed,
    }
}

fn render_io_reports(reports: &[IoPriorityReport], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(reports).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            for report in reports {
                let pids: Vec<String> = report.pids.iter().map(ToString::to_string).collect();
                println!(
                    "{}: pids [{}], verified levels {:?}",
                    report.process,
                    pids.join(", "),
                    report.verified_levels
                );
            }
        }
        OutputFormat::Summary => {
            println!("io-priority: {} collector daemons verified", reports.len());
        }
    }
}

fn cmd_samba(runner: &dyn Runner, opts: &ShareOpts, format: OutputFormat) -> ExitCode {
    let config = opts.to_config();
    let result = roundtrip::apply_config(runner, &config)
        .and_then(|()| verify_backend(runner, &config).map_err(RoundTripError::from));

    match result {
        Ok(()) => {
            match format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config.expected()).unwrap_or_default()
                    );
                }
                OutputFormat::Text => {
                    println!("{}: backend artifacts verified", config.combination_label());
                }
                OutputFormat::Summary => println!("samba: ok"),
            }
            ExitCode::Clean
        }
        Err(e) => report_failure(e.into(), format),
    }
}

fn cmd_round_trip(runner: &dyn Runner, opts: &RoundTripOpts, format: OutputFormat) -> ExitCode {
    let config = opts.share.to_config();

    if opts.matrix {
        let outcome = samba::run_matrix(runner, &config);
        render_matrix(&outcome, format);
        return if outcome.failed == 0 {
            ExitCode::Clean
        } else {
            ExitCode::CheckFailed
        };
    }

    match samba::run_round_trip(runner, &config) {
        Ok(report) => {
            match format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&report).unwrap_or_default()
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}: round-trip ok ({} ms, file {})",
                        report.combination, report.duration_ms, report.file_name
                    );
                }
                OutputFormat::Summary => println!("round-trip: ok"),
            }
            ExitCode::Clean
        }
        Err(e) => report_failure(e.into(), format),
    }
}

fn render_matrix(outcome: &MatrixOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(outcome).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            for result in &outcome.results {
                match &result.error {
                    None => println!("PASS {} ({} ms)", result.combination, result.duration_ms),
                    Some(error) => println!("FAIL {}: {}", result.combination, error),
                }
            }
            println!("{}/{} combinations passed", outcome.successful, outcome.total);
        }
        OutputFormat::Summary => {
            println!(
                "round-trip matrix: {}/{} passed",
                outcome.successful, outcome.total
            );
        }
    }
}

