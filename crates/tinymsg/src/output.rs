use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tinymsg_frame::Message;
use tinymsg_server::ConnId;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    conn: usize,
    msgno: u16,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    timestamp: String,
}

pub fn print_message(id: ConnId, message: &Message, format: OutputFormat) {
    let (kind, alias, text) = match message {
        Message::Text { alias, text } => ("text", Some(alias.as_str()), Some(text.as_str())),
        Message::Leave => ("leave", None, None),
    };

    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                conn: id.0,
                msgno: message.msgno(),
                kind,
                alias,
                text,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CONN", "MSGNO", "KIND", "ALIAS", "TEXT"])
                .add_row(vec![
                    id.0.to_string(),
                    message.msgno().to_string(),
                    kind.to_string(),
                    alias.unwrap_or("").to_string(),
                    text.unwrap_or("").to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match message {
            Message::Text { alias, text } => println!("[{id}] <{alias}> {text}"),
            Message::Leave => println!("[{id}] left"),
        },
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
