// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use gingko_db::Store;
use gingko_tui::TuiOptions;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `gingko --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = config.db_path()?;
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    logging::init(&config.log_level(), &config.log_file()?)?;
    let auto_decision = config.dialog_choice()?;

    let mut store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or GINGKO_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    let mut editor = runtime::open_document(&store, config.tree_name(), options.new_tree)?;
    if options.check_only {
        return Ok(());
    }

    info!(db = %db_path.display(), ?auto_decision, "starting editor");
    gingko_tui::run_app(&mut editor, &mut store, &TuiOptions { auto_decision })?;
    info!(dirty = editor.is_dirty(), "editor closed");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    new_tree: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        new_tree: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--new" => {
                options.new_tree = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("gingko");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --new                    Start a new tree instead of the stored one");
    println!("  --check                  Validate config + DB + log setup");
    println!("  --help                   Show this help");
}
