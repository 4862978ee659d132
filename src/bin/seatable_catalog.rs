use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use seatable_catalog::app::App;
use seatable_catalog::config::{ConfigLoader, ConfigOverrides};
use seatable_catalog::error::CatalogError;
use seatable_catalog::output::{ConsoleOutput, JsonOutput, OutputMode};
use seatable_catalog::seatable::SeatableHttpClient;

#[derive(Parser)]
#[command(name = "seatable-catalog")]
#[command(about = "Generate a static HTML artwork catalog from a SeaTable base")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (defaults to ./catalog.json when present)
    #[arg(long)]
    config: Option<String>,

    /// SeaTable server URL
    #[arg(long)]
    server_url: Option<String>,

    /// API token of the base (prefer SEATABLE_API_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Table to read; the first table is used when omitted
    #[arg(long)]
    table: Option<String>,

    /// View to read rows from
    #[arg(long)]
    view: Option<String>,

    /// Directory receiving images/ and catalog.html
    #[arg(long)]
    output_dir: Option<String>,

    /// Heading of the generated page
    #[arg(long)]
    title: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    if error.is_config() {
        2
    } else if error.is_remote() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    let overrides = ConfigOverrides {
        server_url: cli.server_url,
        api_token: cli.token,
        table_name: cli.table,
        view_name: cli.view,
        output_dir: cli.output_dir,
        title: cli.title,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    let client = SeatableHttpClient::new(&config.server_url, &config.api_token)?;
    let app = App::new(config, client);

    match output_mode {
        OutputMode::Console => {
            println!("SeaTable Static Catalog Generator");
            println!("{}", "=".repeat(50));
            let result = app.build(&ConsoleOutput)?;
            ConsoleOutput::print_summary(&result);
        }
        OutputMode::Json => {
            let result = app.build(&JsonOutput)?;
            JsonOutput::print_result(&result).into_diagnostic()?;
        }
    }
    Ok(())
}
