//! `datalab` command line
//!
//! Lists plugin modules, validates parameters, runs processing configs and
//! pipelines, and previews plot configurations on an in-memory surface.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use datalab_core::{EngineConfig, PluginCategory};
use datalab_registry::ModeFilter;

fn category_arg() -> Arg {
    Arg::new("category")
        .required(true)
        .value_parser(["processing", "manipulation", "plot"])
        .help("Plugin directory to use")
}

fn path_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn cli() -> Command {
    Command::new("datalab")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Schema-driven plugin engine for instrument data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration file (TOML)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("discover")
                .about("List the modules in a plugin directory")
                .arg(category_arg())
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .default_value("all")
                        .help("Comma-separated mode tags, or 'all'"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output descriptors and schemas as JSON"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a parameter file against a module schema")
                .arg(category_arg())
                .arg(Arg::new("module").required(true).help("Module display name"))
                .arg(path_arg("params", "Parameter file (JSON or YAML)"))
                .arg(
                    Arg::new("columns")
                        .long("columns")
                        .value_delimiter(',')
                        .help("Column names available for column fields"),
                ),
        )
        .subcommand(
            Command::new("process")
                .about("Run a processing module from an exported config")
                .arg(path_arg("run-config", "Processing config (JSON or YAML)"))
                .arg(
                    Arg::new("input")
                        .long("input")
                        .short('i')
                        .value_parser(value_parser!(PathBuf))
                        .help("Input file; overrides the config's input_file"),
                ),
        )
        .subcommand(
            Command::new("pipeline")
                .about("Apply an exported manipulation pipeline to a table")
                .arg(path_arg("pipeline", "Exported pipeline (JSON)"))
                .arg(path_arg("input", "Input table"))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the result here instead of printing JSON"),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Activate an exported plot configuration and print the surface state")
                .arg(path_arg("plot-config", "Exported plot configuration (JSON)")),
        )
        .subcommand(Command::new("config").about("Print the effective engine configuration"))
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    let Some((name, args)) = matches.subcommand() else {
        return ExitCode::FAILURE;
    };
    logging::init(args.get_count("verbose"), args.get_flag("log-json"));

    match run(name, args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(command = name, error = %e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(name: &str, args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let engine = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("cannot load configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match name {
        "discover" => {
            let filter: ModeFilter = args
                .get_one::<String>("mode")
                .map_or(Ok(ModeFilter::All), |m| m.parse())?;
            commands::discover(&engine, category(args)?, &filter, args.get_flag("json"))
        }
        "validate" => {
            let columns: Option<Vec<String>> = args.get_many::<String>("columns").map(|c| c.cloned().collect());
            commands::validate(
                &engine,
                category(args)?,
                required::<String>(args, "module")?,
                required::<PathBuf>(args, "params")?,
                columns.as_deref(),
            )
        }
        "process" => commands::process(
            &engine,
            required::<PathBuf>(args, "run-config")?,
            args.get_one::<PathBuf>("input").map(PathBuf::as_path),
        ),
        "pipeline" => commands::pipeline(
            &engine,
            required::<PathBuf>(args, "pipeline")?,
            required::<PathBuf>(args, "input")?,
            args.get_one::<PathBuf>("output").map(PathBuf::as_path),
        ),
        "render" => commands::render(&engine, required::<PathBuf>(args, "plot-config")?),
        "config" => {
            print!("{}", engine.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
        other => anyhow::bail!("unknown command '{other}'"),
    }
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a T> {
    args.get_one::<T>(name)
        .with_context(|| format!("missing argument <{name}>"))
}

fn category(args: &ArgMatches) -> anyhow::Result<PluginCategory> {
    Ok(required::<String>(args, "category")?.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn global_flags_reach_subcommands() {
        let matches = cli()
            .try_get_matches_from(["datalab", "discover", "plot", "-vv", "--mode", "pre,post"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "discover");
        assert_eq!(args.get_count("verbose"), 2);
        assert_eq!(args.get_one::<String>("mode").map(String::as_str), Some("pre,post"));
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(cli().try_get_matches_from(["datalab", "discover", "widgets"]).is_err());
    }
}
