pub mod commands;
pub mod handlers;

pub use commands::{CliArgs, Commands, InvokeArgs};
pub use handlers::{handle_invoke, handle_render_config, handle_serve, invoke_event};
