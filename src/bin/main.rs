use std::{error::Error, process::ExitCode};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tandem::{
    cli::{Cli, Commands, parse_args},
    config::{Settings, load_config},
    signals::SignalListener,
    state::Role,
    supervisor::Supervisor,
    template,
};

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    match args.command {
        Commands::Run { config } => {
            // Handlers go in first so a signal during templating is not lost.
            let listener = SignalListener::install()?;
            let settings = load_settings(config.as_deref())?;

            let mut supervisor = Supervisor::new(settings);
            let cause = supervisor
                .run(listener.events())
                .inspect_err(|err| error!("{err}"))?;

            info!("Exiting ({cause})");
            Ok(ExitCode::from(cause.exit_code()))
        }
        Commands::Render { config } => {
            let settings = load_settings(config.as_deref())?;
            template::configure_all(&settings)?;

            for role in [Role::Independent, Role::Dependent] {
                let spec = settings.spec(role);
                println!("{}: {}", spec.name, spec.config.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_settings(config_path: Option<&str>) -> Result<Settings, Box<dyn Error>> {
    let settings = load_config(config_path)
        .and_then(|config| config.settings())
        .inspect_err(|err| error!("{err}"))?;
    Ok(settings)
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
