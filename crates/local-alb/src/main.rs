use anyhow::Context;
use clap::{Parser, ValueEnum};
use local_alb::{AlbServer, Config, RuleSet};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "local-alb", version, about)]
struct Args {
    /// Listener rules configuration (YAML, or JSON with a .json extension)
    #[arg(short, long, env = "LOCAL_ALB_CONFIG", default_value = "local-alb.yaml")]
    config: PathBuf,

    /// Override listen.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Validate and compile the configuration, then exit
    #[arg(long)]
    check: bool,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

fn load_config(args: &Args) -> Result<Config, anyhow::Error> {
    let mut config = Config::from_file(&args.config)?;
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    Ok(config)
}

fn check(config: &Config) -> Result<(), anyhow::Error> {
    let rules = RuleSet::compile(config).context("Failed to compile rules")?;
    println!(
        "Configuration OK: listen port {}, {} rules, {} default actions",
        config.listen.port,
        rules.rules().len(),
        rules.default_actions().len()
    );
    for rule in rules.rules() {
        let kinds: Vec<_> = rule.actions.iter().map(|a| a.kind()).collect();
        println!(
            "  {}: {} conditions -> {}",
            rule.name,
            rule.conditions.len(),
            kinds.join(", ")
        );
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), anyhow::Error> {
    let config = load_config(&args)?;

    if args.check {
        return check(&config);
    }

    info!("Loaded configuration from {}", args.config.display());
    let server = AlbServer::new(config)?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_format);

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
