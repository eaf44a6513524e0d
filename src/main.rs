use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell as CompShell};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use zipswarm::commands::{run, single};
use zipswarm::observability;

#[derive(Parser)]
#[command(name = "zipswarm")]
#[command(version)]
#[command(about = "Swarm an upload service with simulated users")]
#[command(long_about = None)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test with many simulated users
    Run {
        /// Target host, e.g. http://localhost:8080
        #[arg(long = "host", env = "ZIPSWARM_HOST")]
        host: String,
        /// Number of simulated users
        #[arg(short = 'u', long = "users", default_value = "1")]
        users: u32,
        /// Users started per second
        #[arg(short = 'r', long = "spawn-rate", default_value = "1")]
        spawn_rate: f64,
        /// Stop after this long (e.g. "30s", "5m"); runs until Ctrl-C if omitted
        #[arg(short = 't', long = "run-time")]
        run_time: Option<String>,
        /// YAML scenario file replacing the built-in upload scenario
        #[arg(long = "scenario")]
        scenario: Option<PathBuf>,
        /// Progress report interval
        #[arg(long = "report-interval", default_value = "5s")]
        report_interval: String,
        /// Per-request timeout
        #[arg(long = "timeout", default_value = "60s")]
        timeout: String,
        /// Report formats (comma-separated: json, csv, html)
        #[arg(long = "report")]
        report: Option<String>,
        /// Directory for report files
        #[arg(long = "out", default_value = "reports/")]
        out: PathBuf,
    },
    /// Run a single simulated user in-process (smoke test)
    Single {
        /// Target host, e.g. http://localhost:8080
        #[arg(long = "host", env = "ZIPSWARM_HOST")]
        host: String,
        /// YAML scenario file replacing the built-in upload scenario
        #[arg(long = "scenario")]
        scenario: Option<PathBuf>,
        /// Stop after this many tasks; runs until Ctrl-C if omitted
        #[arg(short = 'n', long = "iterations")]
        iterations: Option<u64>,
        /// Per-request timeout
        #[arg(long = "timeout", default_value = "60s")]
        timeout: String,
    },
    /// Generate shell completions (internal)
    #[command(hide = true)]
    Completions {
        /// Shell: bash, zsh, fish
        shell: String,
    },
    /// Generate man page (internal)
    #[command(hide = true)]
    Man,
}

fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    if atty::is(atty::Stream::Stdout) {
        println!(
            "{} {} {}",
            "zipswarm".cyan().bold(),
            format!("v{}", version).dimmed(),
            "— upload load generator".dimmed()
        );
    } else {
        println!("zipswarm v{} — upload load generator", version);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::initialize_tracing(cli.verbose);

    if matches!(cli.command, Commands::Run { .. } | Commands::Single { .. }) {
        print_banner();
    }

    match cli.command {
        Commands::Run {
            host,
            users,
            spawn_rate,
            run_time,
            scenario,
            report_interval,
            timeout,
            report,
            out,
        } => {
            run::handle_run(run::RunOptions {
                host,
                users,
                spawn_rate,
                run_time,
                scenario,
                report_interval,
                timeout,
                report,
                out,
            })
            .await?;
        }
        Commands::Single {
            host,
            scenario,
            iterations,
            timeout,
        } => {
            single::handle_single(single::SingleOptions {
                host,
                scenario,
                iterations,
                timeout,
            })
            .await?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            let sh = match shell.as_str() {
                "bash" => CompShell::Bash,
                "zsh" => CompShell::Zsh,
                "fish" => CompShell::Fish,
                "powershell" | "pwsh" => CompShell::PowerShell,
                "elvish" => CompShell::Elvish,
                other => {
                    eprintln!(
                        "Unsupported shell: {} (use bash|zsh|fish|powershell|elvish)",
                        other
                    );
                    std::process::exit(2);
                }
            };
            generate(sh, &mut cmd, name, &mut std::io::stdout());
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            man.render(&mut std::io::stdout())?;
        }
    }

    Ok(())
}
