use std::io::Write;

use tinymsg_frame::Message;
use tinymsg_transport::connect;
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, io_error, transport_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let message = Message::Text {
        alias: args.alias.clone(),
        text: args.text.clone(),
    };
    // Encode before connecting so bad field lengths fail fast.
    let wire = message
        .encode(&args.agent)
        .map_err(|err| frame_error("encode failed", err))?;

    let mut stream =
        connect(args.addr).map_err(|err| transport_error("connect failed", err))?;

    for n in 0..args.count {
        stream
            .write_all(&wire)
            .map_err(|err| io_error("send failed", err))?;
        debug!(n, "frame sent");
    }

    if args.leave {
        let leave = Message::Leave
            .encode(&args.agent)
            .map_err(|err| frame_error("encode failed", err))?;
        stream
            .write_all(&leave)
            .map_err(|err| io_error("send failed", err))?;
    }

    Ok(SUCCESS)
}
