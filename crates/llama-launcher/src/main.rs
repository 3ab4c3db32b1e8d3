// llama-launcher/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use dotenvy::dotenv;
#[cfg(feature = "cli")]
use llama_launcher::{
    config::{check_non_negative, gib_to_bytes},
    telemetry::init_tracing, LaunchError, Launcher, LauncherConfig,
    LocalPortProbe, Session, SessionOutcome, SystemMemoryProbe, TerminalPrompter,
};
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Build a llama-server command interactively, with memory and port checks.
#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "llama-launcher", version, about)]
struct Cli {
    /// Config file holding `model_dir`
    #[arg(long, env = "LLAMA_LAUNCHER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server binary to look up and launch
    #[arg(long, env = "LLAMA_BIN", value_name = "BINARY")]
    binary: Option<String>,

    /// Print the command without running it
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, also print the launch plan as JSON
    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Memory kept in reserve when estimating safe usage
    #[arg(long, env = "LLAMA_LAUNCHER_OVERHEAD_GIB", value_name = "GIB")]
    overhead_gib: Option<f64>,

    /// Estimated context cost per token
    #[arg(long, env = "LLAMA_LAUNCHER_MIB_PER_TOKEN", value_name = "MIB")]
    mib_per_token: Option<f64>,

    /// -v for info logs, -vv for debug
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[cfg(feature = "cli")]
impl Cli {
    fn apply(&self, cfg: &mut LauncherConfig) -> Result<(), LaunchError> {
        if let Some(path) = &self.config {
            cfg.config_path = path.clone();
        }
        if let Some(binary) = &self.binary {
            cfg.binary = binary.clone();
        }
        if let Some(gib) = self.overhead_gib {
            cfg.overhead_margin_bytes = gib_to_bytes(check_non_negative(gib, "overhead margin in GiB")?);
        }
        if let Some(mib) = self.mib_per_token {
            cfg.mib_per_token = check_non_negative(mib, "MiB-per-token coefficient")?;
        }
        cfg.dry_run = self.dry_run;
        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => Ok(()),
        Err(LaunchError::Interrupted) => {
            println!("\nAborted.");
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            eprintln!("\nError: {}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(feature = "cli")]
fn run(cli: &Cli) -> Result<(), LaunchError> {
    let mut cfg = LauncherConfig::from_env()?;
    cli.apply(&mut cfg)?;
    cfg.print_config();

    let mut prompter = TerminalPrompter::new();
    let memory = SystemMemoryProbe::new();
    let ports = LocalPortProbe::new(cfg.port_probe_timeout);
    let mut session = Session::new(&cfg, &mut prompter, &memory, &ports);

    let (plan, config) = match session.run()? {
        SessionOutcome::Ready { plan, config } => (plan, config),
        SessionOutcome::Cancelled => {
            println!("Exiting.");
            return Ok(());
        }
    };

    if cfg.dry_run {
        session.preview(&plan);
        if cli.json {
            let json = serde_json::to_string_pretty(&plan)
                .map_err(|e| LaunchError::Io(e.into()))?;
            println!("{}", json);
        }
        return Ok(());
    }

    if !session.confirm_launch(&plan)? {
        return Ok(());
    }

    let launcher = Launcher::new(cfg.binary.clone(), cfg.config_path.clone());
    match launcher.launch(&plan, &config)? {}
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
