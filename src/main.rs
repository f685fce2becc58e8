use site_pipeline::cli::commands::{CliArgs, Commands};
use site_pipeline::cli::handlers::{handle_invoke, handle_render_config, handle_serve};
use site_pipeline::util::logging::{config_from_env, init_logging, parse_level, LoggingConfig};
use site_pipeline::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("site-pipeline v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Serve => handle_serve().await,
        Commands::Invoke(invoke_args) => handle_invoke(invoke_args).await,
        Commands::RenderConfig => handle_render_config(),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let base = match args.command {
        Commands::Serve => LoggingConfig::function_runtime(),
        _ => LoggingConfig::default(),
    };
    let mut config = config_from_env(base);

    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    init_logging(config);
}
