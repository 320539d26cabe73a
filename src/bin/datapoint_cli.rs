use clap::Parser;
use datapoint::{resolve, Accumulator, DataPoint, EngineConfig, TransformExpression};
use log::{error, info};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML or JSON configuration file with entities and values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transform expression to resolve
    #[arg(short, long)]
    expression: String,

    /// Initial value as JSON
    #[arg(short, long, default_value = "null")]
    value: String,

    /// Parameters as a JSON object, visible to templates as `params`
    #[arg(short, long)]
    params: Option<String>,

    /// Pretty-print the result
    #[arg(long)]
    pretty: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

async fn run(cli: Cli, config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let value: Value = serde_json::from_str(&cli.value)?;
    let params: Value = match &cli.params {
        Some(params) => serde_json::from_str(params)?,
        None => Value::Object(Default::default()),
    };

    let datapoint = DataPoint::from_config(&config)?;
    let expression = TransformExpression::parse(&cli.expression);
    info!("Resolving {} stage(s)", expression.len());

    let store = datapoint.store();
    let acc = Accumulator::new(value).with_params(params);
    let result = resolve(&store, acc, &expression).await?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&result.value)?
    } else {
        serde_json::to_string(&result.value)?
    };
    println!("{}", output);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = datapoint::logging::init(&config.logging) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
