use std::net::SocketAddr;

use tinymsg_frame::Message;
use tinymsg_server::{ConnId, DisconnectReason, MessageSink, Server};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{server_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// Prints every decoded message; optionally echoes text frames back.
struct PrintSink {
    format: OutputFormat,
    echo: bool,
}

impl MessageSink for PrintSink {
    fn on_connect(&mut self, id: ConnId, peer: SocketAddr) {
        info!(%id, %peer, "client connected");
    }

    fn on_message(&mut self, id: ConnId, message: Message) -> Option<Message> {
        print_message(id, &message, self.format);
        if self.echo && matches!(message, Message::Text { .. }) {
            Some(message)
        } else {
            None
        }
    }

    fn on_disconnect(&mut self, id: ConnId, reason: &DisconnectReason) {
        info!(%id, %reason, "client disconnected");
    }
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut server = Server::bind(args.addr)
        .map_err(|err| server_error("bind failed", err))?
        .with_agent(&args.agent);

    let handle = server.shutdown_handle();
    ctrlc::set_handler(move || handle.shutdown()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })?;

    let mut sink = PrintSink {
        format,
        echo: args.echo,
    };
    server
        .run(&mut sink)
        .map_err(|err| server_error("server loop failed", err))?;

    Ok(SUCCESS)
}
