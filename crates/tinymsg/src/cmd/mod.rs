use std::net::SocketAddr;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the multiplexing server and print received messages.
    Serve(ServeArgs),
    /// Send text frames to a running server.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 127.0.0.1:8001.
    pub addr: SocketAddr,
    /// Agent name written into reply frame headers.
    #[arg(long, default_value = "tinymsg-server")]
    pub agent: String,
    /// Echo every text frame back to its sender.
    #[arg(long)]
    pub echo: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server address, e.g. 127.0.0.1:8001.
    pub addr: SocketAddr,
    /// Alias field of the text message.
    #[arg(long)]
    pub alias: String,
    /// Text field of the text message.
    #[arg(long)]
    pub text: String,
    /// Agent name written into the frame header.
    #[arg(long, default_value = "tinymsg-cli")]
    pub agent: String,
    /// Number of copies to send.
    #[arg(long, default_value_t = 1)]
    pub count: usize,
    /// Send a leave frame after the text frames.
    #[arg(long)]
    pub leave: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Print extended build information.
    #[arg(long)]
    pub extended: bool,
}
