use tracing_subscriber::{EnvFilter, fmt};
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging; stderr keeps stdout clean for command output
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match timeclock::cli::parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}\n\n{}", timeclock::cli::usage("timeclock"));
            std::process::exit(2);
        }
    };
    debug!(target: "timeclock", command = ?args.command, "starting");
    timeclock::cli::run(args).await
}
