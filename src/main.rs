use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;

use dualscreen::audio::LogAudio;
use dualscreen::cli::Cli;
use dualscreen::core::{InputScript, LogHostMenu};
use dualscreen::demo::{build_channels, build_stage};
use dualscreen::resources::Resources;
use dualscreen::{AppConfig, Application};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.apply_cli(cli).context("applying command-line overrides")?;

    let resources = Resources::load_dir(&config.resources)
        .with_context(|| format!("loading resources from {}", config.resources.display()))?;

    let script = config
        .input_script
        .as_deref()
        .map(InputScript::load)
        .transpose()
        .context("loading input script")?;
    let channels = build_channels(script.as_ref());

    let mut app = Application::new(
        config,
        resources,
        channels,
        Box::new(LogAudio::default()),
        Box::new(LogHostMenu),
    )
    .context("starting application")?;

    let exit_code = app.exec(build_stage).context("render loop failed")?;
    log::info!("exiting with {exit_code:?} ({})", exit_code.code());
    Ok(exit_code.code())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Application teardown runs inside `run`, before the process exits
    let code = run(&cli)?;
    std::process::exit(code);
}
