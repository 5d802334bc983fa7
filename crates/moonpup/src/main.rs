mod cli;
mod fonts;
mod paths;
mod run;
mod settings;

use anyhow::Result;
use cli::Command;
use settings::Settings;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let config = cli.config.as_deref();
    match cli.command {
        Some(Command::Check(args)) => run::check(&args.shaders),
        Some(Command::Layout(args)) => run::layout(&Settings::load(config)?, args),
        Some(Command::Fonts(args)) => run::fonts(&Settings::load(config)?, args),
        None => run::run(&Settings::load(config)?, cli.run),
    }
}
