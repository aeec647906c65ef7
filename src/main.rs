//! Pi Diagnostics - Raspberry Pi diagnostics binary
//!
//! Serves the HTML diagnostics report, writes reports to disk, dumps the
//! Pi-hole configuration and runs the Prometheus exporter.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pi_diagnostics::{
    is_privileged, run_exporter, start_web_server, Boundary, ExporterConfig, LocalHost,
    PiholeConfig, PiholeReporter, ProbeConfig, RefreshMode, ReportGenerator, ServeMode,
    Thresholds, WebConfig, DEFAULT_BACKOFF_SECS, DEFAULT_EXPORTER_PORT, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REPORT_DIR, DEFAULT_WEB_PORT,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pi_diagnostics")]
#[command(about = "🥧 Pi Diagnostics - Raspberry Pi hardware & network reports")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Hardware detection, HTML diagnostics reports, a Pi-hole configuration \
                        report and a Prometheus exporter for Raspberry Pi")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,

    /// Per-command timeout in seconds for system probes
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    /// Compare temperatures in whole degrees only (70.9 counts as 70)
    #[arg(long, global = true)]
    whole_degrees: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the diagnostics report over HTTP (default)
    Serve(ServeArgs),

    /// Write a timestamped HTML report and print its path
    Report(ReportArgs),

    /// Print the Pi-hole configuration as Markdown
    PiholeReport(PiholeArgs),

    /// Run the Prometheus exporter
    Exporter(ExporterArgs),

    /// Detect and print the hardware profile
    Info(InfoArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Live,
    Archive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RefreshArg {
    Redirect,
    Regenerate,
}

#[derive(Args)]
struct ServeArgs {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Render each request live or serve the newest report file
    #[arg(long, value_enum, default_value_t = ModeArg::Live)]
    mode: ModeArg,

    /// What /refresh does before redirecting
    #[arg(long, value_enum, default_value_t = RefreshArg::Redirect)]
    refresh: RefreshArg,

    /// Directory for report files
    #[arg(long, default_value = DEFAULT_REPORT_DIR)]
    report_dir: PathBuf,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Disable the /api/status endpoint
    #[arg(long)]
    no_api: bool,
}

#[derive(Args)]
struct ReportArgs {
    /// Output directory
    #[arg(short, long, default_value = DEFAULT_REPORT_DIR)]
    output: PathBuf,
}

#[derive(Args)]
struct PiholeArgs {
    /// Pi-hole configuration directory
    #[arg(long, default_value = "/etc/pihole")]
    config_dir: PathBuf,

    /// dnsmasq drop-in directory
    #[arg(long, default_value = "/etc/dnsmasq.d")]
    dnsmasq_dir: PathBuf,
}

#[derive(Args)]
struct ExporterArgs {
    /// Listen address of the metrics endpoint
    #[arg(long, default_value_t = format!("0.0.0.0:{}", DEFAULT_EXPORTER_PORT))]
    listen: String,

    /// Seconds between polls
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    interval: u64,

    /// Seconds to wait after a failed poll
    #[arg(long, default_value_t = DEFAULT_BACKOFF_SECS)]
    backoff: u64,
}

#[derive(Args)]
struct InfoArgs {
    /// Print the profile as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    let host = Arc::new(LocalHost::with_config(
        &ProbeConfig::default().with_command_timeout(Duration::from_secs(cli.timeout)),
    ));

    // The Pi-hole report owns stdout
    let quiet = matches!(cli.command, Some(Commands::PiholeReport(_)));
    if !quiet {
        print_banner();
    }
    if !is_privileged(host.as_ref()).await {
        eprintln!("⚠️  Not running as root: some diagnostics may be incomplete");
        eprintln!();
    }

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args, host).await?,
        Some(Commands::Report(args)) => report_command(&cli, args, host).await?,
        Some(Commands::PiholeReport(args)) => pihole_command(args, host).await,
        Some(Commands::Exporter(args)) => exporter_command(args, host).await?,
        Some(Commands::Info(args)) => info_command(&cli, args, host).await?,
        None => serve_command(&cli, &cli.serve, host).await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner() {
    println!("🥧 Pi Diagnostics - Raspberry Pi Hardware & Network Reports");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn thresholds(cli: &Cli) -> Thresholds {
    let boundary = if cli.whole_degrees {
        Boundary::WholeDegrees
    } else {
        Boundary::Exact
    };
    Thresholds::default().with_boundary(boundary)
}

async fn serve_command(cli: &Cli, args: &ServeArgs, host: Arc<LocalHost>) -> anyhow::Result<()> {
    info!("Detecting hardware...");
    let generator = ReportGenerator::detect(host, thresholds(cli)).await;
    info!("Detected: {}", generator.profile().model);

    let serve_mode = match args.mode {
        ModeArg::Live => ServeMode::Live,
        ModeArg::Archive => ServeMode::Archive,
    };
    let refresh_mode = match args.refresh {
        RefreshArg::Redirect => RefreshMode::Redirect,
        RefreshArg::Regenerate => RefreshMode::Regenerate,
    };

    let web_config = WebConfig::new(&args.host, args.port)
        .with_cors(!args.no_cors)
        .with_api(!args.no_api)
        .with_serve_mode(serve_mode)
        .with_refresh_mode(refresh_mode)
        .with_report_dir(&args.report_dir);

    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - Serve mode: {:?}", serve_mode);
    info!("  - Refresh mode: {:?}", refresh_mode);
    info!("  - Report directory: {}", args.report_dir.display());
    info!("  - Temperature boundary: {:?}", generator.thresholds().boundary);
    info!("  - CORS enabled: {}", !args.no_cors);
    info!("  - Status API enabled: {}", !args.no_api);

    println!("🌐 Serving diagnostics on http://{}/", web_config.bind_address());
    start_web_server(web_config, generator)
        .await
        .context("web server failed")?;

    Ok(())
}

async fn report_command(cli: &Cli, args: &ReportArgs, host: Arc<LocalHost>) -> anyhow::Result<()> {
    let generator = ReportGenerator::detect(host, thresholds(cli)).await;
    let path = generator
        .write_report(&args.output)
        .await
        .with_context(|| format!("failed to write report to {}", args.output.display()))?;
    println!("{}", path.display());
    Ok(())
}

async fn pihole_command(args: &PiholeArgs, host: Arc<LocalHost>) {
    let config = PiholeConfig::default()
        .with_config_dir(&args.config_dir)
        .with_dnsmasq_dir(&args.dnsmasq_dir);
    let report = PiholeReporter::new(host, config)
        .render(chrono::Local::now())
        .await;
    print!("{}", report.body);
}

async fn exporter_command(args: &ExporterArgs, host: Arc<LocalHost>) -> anyhow::Result<()> {
    let config = ExporterConfig::default()
        .with_listen(&args.listen)
        .with_interval(Duration::from_secs(args.interval))
        .with_backoff(Duration::from_secs(args.backoff));

    info!(
        "Starting exporter on {} (interval {}s, backoff {}s)",
        config.listen, args.interval, args.backoff
    );
    run_exporter(config, host).await.context("exporter failed")?;
    Ok(())
}

async fn info_command(cli: &Cli, args: &InfoArgs, host: Arc<LocalHost>) -> anyhow::Result<()> {
    let generator = ReportGenerator::detect(host, thresholds(cli)).await;
    let profile = generator.profile();

    if args.json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    let yes_no = |flag: bool| if flag { "✓" } else { "✗" };

    println!("🥧 Hardware Profile");
    println!("==================");
    println!();
    println!("  Model:          {}", profile.model);
    println!("  Revision:       {}", profile.revision);
    println!("  Memory:         {}", profile.memory);
    println!("  WiFi:           {}", yes_no(profile.has_wifi));
    println!("  Ethernet:       {}", yes_no(profile.has_ethernet));
    println!("  AI accelerator: {}", yes_no(profile.has_ai_hat));
    println!("  Active cooling: {}", yes_no(profile.has_cooling));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::try_parse_from(["pi_diagnostics"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.timeout, 10);
        assert!(!cli.whole_degrees);
        assert_eq!(cli.serve.port, DEFAULT_WEB_PORT);
        assert_eq!(cli.serve.mode, ModeArg::Live);
    }

    #[test]
    fn test_bare_port_serves() {
        let cli = Cli::try_parse_from(["pi_diagnostics", "9090", "--no-cors"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.port, 9090);
        assert!(cli.serve.no_cors);

        assert!(Cli::try_parse_from(["pi_diagnostics", "9090", "info"]).is_err());
    }

    #[test]
    fn test_serve_parsing() {
        let cli = Cli::try_parse_from([
            "pi_diagnostics",
            "serve",
            "9090",
            "--mode",
            "archive",
            "--refresh",
            "regenerate",
            "--no-api",
            "--whole-degrees",
        ])
        .unwrap();

        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 9090);
        assert_eq!(args.mode, ModeArg::Archive);
        assert_eq!(args.refresh, RefreshArg::Regenerate);
        assert!(args.no_api);
        assert!(!args.no_cors);
        assert!(cli.whole_degrees);
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["pi_diagnostics", "serve"]).unwrap();
        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, DEFAULT_WEB_PORT);
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.report_dir, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_exporter_defaults() {
        let cli = Cli::try_parse_from(["pi_diagnostics", "exporter"]).unwrap();
        let Some(Commands::Exporter(args)) = cli.command else {
            panic!("expected exporter");
        };
        assert_eq!(args.listen, "0.0.0.0:9102");
        assert_eq!(args.interval, 30);
        assert_eq!(args.backoff, 60);
    }

    #[test]
    fn test_pihole_dirs() {
        let cli = Cli::try_parse_from([
            "pi_diagnostics",
            "pihole-report",
            "--config-dir",
            "/srv/pihole",
        ])
        .unwrap();
        let Some(Commands::PiholeReport(args)) = cli.command else {
            panic!("expected pihole-report");
        };
        assert_eq!(args.config_dir, PathBuf::from("/srv/pihole"));
        assert_eq!(args.dnsmasq_dir, PathBuf::from("/etc/dnsmasq.d"));
    }

    #[test]
    fn test_whole_degrees_flag() {
        let cli = Cli::try_parse_from(["pi_diagnostics", "info", "--whole-degrees"]).unwrap();
        assert_eq!(thresholds(&cli).boundary, Boundary::WholeDegrees);
    }
}
