use std::io;

use anyhow::Result;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use ramcheck::{
    app::{self, RunOptions},
    cli::Cli,
    config::Config,
    locate::Locator,
    logging,
    pipeline::{Gate, LineGate, NoPause},
    printer::Sink,
    privilege,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    // Early config warnings go to stderr and are replayed into the log
    logging::init();

    // Load config, then let flags win
    let mut cfg = match &args.config {
        Some(path) => Config::load_from(path, std::env::vars()),
        None => Config::load(),
    };
    args.apply(&mut cfg);

    let color = cfg.get_bool("COLOR")
        && std::env::var_os("NO_COLOR").is_none()
        && io::stdout().is_terminal();
    let locator = Locator::from_env();

    if args.list_steps {
        let sink = Sink::stdout(color);
        sink.info(&format!("Settings: {}", cfg.config_path.display()))?;
        let pipeline = app::plan(&cfg, &locator, args.skip_install)?;
        return app::list_steps(&sink, &pipeline);
    }

    // Pausing needs someone at the keyboard
    let pause = cfg.get_bool("PAUSE_BETWEEN_STEPS") && io::stdin().is_terminal();
    let mut gate: Box<dyn Gate> = if pause {
        Box::new(LineGate::stdin())
    } else {
        Box::new(NoPause)
    };

    let opts = RunOptions { skip_install: args.skip_install, color };
    let outcome = app::run(
        &cfg,
        &opts,
        privilege::effective_uid(),
        &locator,
        Box::new(io::stdout()),
        gate.as_mut(),
    )
    .await;

    // Step results never change the exit code; only harness errors do.
    if let Err(e) = outcome {
        if e.downcast_ref::<app::Logged>().is_some() {
            std::process::exit(1);
        }
        if color {
            eprintln!("{} {:#}", "error:".red().bold(), e);
        } else {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(1);
    }
    Ok(())
}
