pub mod cli;
pub mod command;

pub use cli::FfmpegCli;
