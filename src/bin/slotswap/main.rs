use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};

mod cli;
mod util;
mod cmd_inspect;
mod cmd_run;

fn init_logger() {
    // RUST_LOG wins, default is info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Inspect { scene, entity, json } =>
            cmd_inspect::exec(scene, entity, json),

        cli::Cmd::Run { scene, entity, script, out } =>
            cmd_run::exec(scene, entity, script, out),
    }
}
