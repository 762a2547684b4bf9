//! SQLChat - chat with your database in natural language.

use sqlchat::app::Orchestrator;
use sqlchat::cli::Cli;
use sqlchat::config::Config;
use sqlchat::db::seed;
use sqlchat::error::Result;
use sqlchat::{logging, plain, tui};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if cli.plain || cli.init_demo.is_some() {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        eprintln!("{}: {}", e.category(), e.message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(path) = &cli.init_demo {
        seed::create_student_database(path).await?;
        println!("Created sample database at {}", path.display());
        return Ok(());
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config);

    let form = cli.form_input(&config);
    let orchestrator = Orchestrator::new(&config);

    if cli.plain {
        let mut session = orchestrator.start(&form).await?;
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        plain::run(&mut session, stdin, &mut stdout).await
    } else {
        info!("Log file: {}", logging::get_log_path().display());
        tui::run(&orchestrator, &form).await
    }
}
