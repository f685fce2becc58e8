use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build-and-publish pipeline for tenant static sites
#[derive(Parser, Debug)]
#[command(
    name = "site-pipeline",
    about = "Build-and-publish pipeline for tenant static sites",
    version,
    author,
    long_about = "site-pipeline reacts to a source archive landing in the archive store: \
                  it unpacks the archive, writes the site configuration into the tree, \
                  runs the build toolchain and publishes the output to the serving bucket."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run under the function runtime",
        long_about = "Polls the function runtime for upload notifications and runs the \
                      pipeline once per notification. Configuration is read from the \
                      environment when the instance starts."
    )]
    Serve,

    #[command(
        about = "Run the pipeline for one notification file",
        long_about = "Reads an upload notification from a JSON file and runs the pipeline \
                      locally.\n\n\
                      Examples:\n  \
                      site-pipeline invoke --event event.json\n  \
                      site-pipeline invoke --event event.json --local-store ./buckets"
    )]
    Invoke(InvokeArgs),

    #[command(
        about = "Print the generated environment file",
        long_about = "Renders the site configuration from the environment exactly as it \
                      would be written into the source tree."
    )]
    RenderConfig,
}

#[derive(Parser, Debug, Clone)]
pub struct InvokeArgs {
    #[arg(long, value_name = "FILE", help = "Notification JSON file")]
    pub event: PathBuf,

    #[arg(
        long,
        value_name = "DIR",
        help = "Serve buckets from subdirectories of DIR instead of S3"
    )]
    pub local_store: Option<PathBuf>,
}
