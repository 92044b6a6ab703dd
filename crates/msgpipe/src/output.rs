use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use msgpipe_dispatch::TYPE_KEY;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One frame read off a stream, with its payload decoded when possible.
#[derive(Debug)]
pub struct InspectedFrame {
    pub index: usize,
    pub payload: Vec<u8>,
    pub decoded: Result<Value, String>,
}

impl InspectedFrame {
    /// The `$type` tag, if the payload is a tagged request.
    pub fn tag(&self) -> Option<&str> {
        self.decoded.as_ref().ok()?.get(TYPE_KEY)?.as_str()
    }

    fn kind(&self) -> &'static str {
        match &self.decoded {
            Ok(value) => json_kind(value),
            Err(_) => "undecodable",
        }
    }

    fn preview(&self) -> String {
        match &self.decoded {
            Ok(value) => value.to_string(),
            Err(_) => match std::str::from_utf8(&self.payload) {
                Ok(text) => text.to_string(),
                Err(_) => format!("<binary {} bytes>", self.payload.len()),
            },
        }
    }
}

/// Human-readable kind of a JSON value.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    index: usize,
    size: usize,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub fn print_frame(frame: &InspectedFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                index: frame.index,
                size: frame.payload.len(),
                tag: frame.tag(),
                kind: frame.kind(),
                payload: frame.decoded.as_ref().ok(),
                error: frame.decoded.as_ref().err().map(String::as_str),
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
                .set_header(vec!["#", "SIZE", "TYPE", "PAYLOAD"])
                .add_row(vec![
                    frame.index.to_string(),
                    frame.payload.len().to_string(),
                    frame.tag().unwrap_or("-").to_string(),
                    frame.preview(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={} size={} type={} kind={} payload={}",
                frame.index,
                frame.payload.len(),
                frame.tag().unwrap_or("-"),
                frame.kind(),
                frame.preview()
            );
        }
        OutputFormat::Raw => {
            let _ = write_raw(&frame.payload);
        }
    }
}

/// Write bytes to stdout unmodified.
pub fn write_raw(data: &[u8]) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(data)?;
    out.flush()
}
