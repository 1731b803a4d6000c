use clap::{Arg, ArgMatches, Command};
use middash::api;
use middash::config::DashConfig;
use middash::doctor::{CheckStatus, DashDoctor};
use std::path::PathBuf;

fn common_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .help("Port to listen on"),
    )
    .arg(
        Arg::new("config")
            .long("config")
            .value_name("FILE")
            .help("Path to a TOML config file"),
    )
    .arg(
        Arg::new("data-dir")
            .long("data-dir")
            .value_name("DIR")
            .help("Directory holding the JSON data files"),
    )
    .arg(
        Arg::new("export-dir")
            .long("export-dir")
            .value_name("DIR")
            .help("Directory CSV exports are written to"),
    )
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let matches = Command::new("middash")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Internal dashboard service for server inventory and a shell command catalog")
        .subcommand(common_args(Command::new("serve").about("Run the HTTP API")))
        .subcommand(common_args(Command::new("doctor").about(
            "Check data directories and files without starting the server",
        )))
        .get_matches();

    match matches.subcommand() {
        Some(("serve", sub)) => run_serve(sub).await,
        Some(("doctor", sub)) => run_doctor(sub),
        _ => {
            // No subcommand: serve with defaults and environment overrides.
            let config = match DashConfig::load(None) {
                Ok(config) => config,
                Err(e) => fatal(e),
            };
            serve(config).await;
        }
    }
}

async fn run_serve(matches: &ArgMatches) {
    let config = match load_config(matches) {
        Ok(config) => config,
        Err(e) => fatal(e),
    };
    serve(config).await;
}

async fn serve(config: DashConfig) {
    if let Err(e) = api::serve(config).await {
        eprintln!("💥 Server error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_doctor(matches: &ArgMatches) {
    let config = match load_config(matches) {
        Ok(config) => config,
        Err(e) => fatal(e),
    };

    let report = DashDoctor::new().run(&config);
    for check in &report.checks {
        let icon = match check.status {
            CheckStatus::Pass => "✅",
            CheckStatus::Warning => "⚠️ ",
            CheckStatus::Fail => "❌",
        };
        println!("{} {}: {}", icon, check.name, check.message);
    }

    if report.overall_health == CheckStatus::Fail {
        std::process::exit(1);
    }
}

/// Precedence: CLI flags > environment > config file > defaults.
fn load_config(matches: &ArgMatches) -> anyhow::Result<DashConfig> {
    let path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = DashConfig::load(path.as_deref())?;

    if let Some(port) = matches.get_one::<String>("port") {
        config.port = port
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid port: {}", port))?;
    }
    if let Some(dir) = matches.get_one::<String>("data-dir") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(dir) = matches.get_one::<String>("export-dir") {
        config.export_dir = PathBuf::from(dir);
    }

    Ok(config)
}

fn fatal(e: anyhow::Error) -> ! {
    eprintln!("💥 {:#}", e);
    std::process::exit(1);
}
