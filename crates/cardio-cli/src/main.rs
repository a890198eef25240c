use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use std::path::PathBuf;

use cardio_cli::commands::predict::{build_request, response_json, run_prediction};
use cardio_cli::commands::train::{format_summary, run_training};
use cardio_cli::config::{default_config_json, resolve_config};
use cardio_cli::logging::init_file_logging;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help("Path to a JSON pipeline configuration. Defaults are used when omitted.")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<()> {
    let matches = Command::new("cardio")
        .version(clap::crate_version!())
        .about("Heart-disease classifier: train on clinical records and serve predictions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Split the raw dataset, fit the preprocessor and search for the best model")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("predict")
                .about("Predict from the persisted artifacts for one record")
                .arg(config_arg())
                .arg(
                    Arg::new("request")
                        .short('r')
                        .long("request")
                        .help("JSON file with the 13 clinical fields")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("field")
                        .short('f')
                        .long("field")
                        .help("A single field as name=value; overrides the request file")
                        .action(ArgAction::Append)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(Command::new("config").about("Print the default configuration as JSON"))
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("config", _)) => {
            println!("{}", default_config_json()?);
            Ok(())
        }
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches.get_one::<PathBuf>("config"))?;
    let log_path = init_file_logging(&config.log_dir)?;
    eprintln!("[Cardio::Train] Logging to {}", log_path.display());

    match run_training(&config) {
        Ok(summary) => {
            println!("{}", format_summary(&summary));
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            eprintln!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches.get_one::<PathBuf>("config"))?;
    init_file_logging(&config.log_dir)?;

    let fields: Vec<String> = matches
        .get_many::<String>("field")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let request_file = matches.get_one::<PathBuf>("request").map(PathBuf::as_path);
    let request = build_request(request_file, &fields)?;

    let response = run_prediction(&config, &request);
    println!("{}", response_json(&response)?);
    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
