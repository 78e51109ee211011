use anyhow::Result;
use clap::Parser;
use history_buff::cli::Args;
use history_buff::generator::workflow::launch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "history_buff=debug"
    } else {
        "history_buff=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args) -> Result<()> {
    let config = args.into_config()?;
    init_tracing(config.verbose);

    let stdin = std::io::stdin();
    let (config, topic) = args.prepare_run(
        &config,
        |name| std::env::var(name).ok(),
        stdin.lock(),
        std::io::stdout(),
    )?;

    let summary = launch(&config, &topic).await?;

    println!("\n\nFinal Report:\n{}", summary.report);
    for path in &summary.saved_files {
        println!("📄 {}", path.display());
    }
    if config.telemetry {
        println!("\n{}", summary.timing_report);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("❌ An error occurred while running the crew: {:?}", e);
        std::process::exit(1);
    }
}
