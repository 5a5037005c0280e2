/*!
Compose command - convert JSON to CBOR
*/

use super::io::{self, Input, Output};
use anyhow::Context;
use cbor_codec::{EncodeOptions, Flags, StringRef, Value};
use clap::Parser;
use std::path::PathBuf;
use tracing::*;

/// Convert JSON to CBOR binary
#[derive(Parser, Debug)]
#[command(
    about = "Convert JSON to CBOR binary",
    long_about = "Parse JSON and convert it to CBOR binary.\n\n\
                  JSON strings and object keys become CBOR text strings unless the\n\
                  options file selects different string flags."
)]
pub struct Command {
    /// Prefix the output with the self-describe tag (55799)
    #[arg(long)]
    self_describe: bool,

    /// Deduplicate repeated strings with string references (tags 256/25)
    #[arg(long)]
    string_ref: bool,

    /// Emit deterministic (CDE) encoding with sorted map keys
    #[arg(long)]
    deterministic: bool,

    /// JSON file with encode options
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<Output>,

    /// Input JSON file (use '-' for stdin)
    #[arg(default_value = "-")]
    input: Input,
}

impl Command {
    pub fn exec(self) -> anyhow::Result<()> {
        let text = self.input.read_to_string()?;
        let json: serde_json::Value = serde_json::from_str(&text).context("Failed to parse JSON")?;

        let mut options = match &self.options {
            Some(path) => io::read_options::<EncodeOptions>(path)?,
            None => EncodeOptions::with_flags(Flags::TEXT | Flags::KEY_TEXT),
        };
        if self.self_describe {
            options.flags |= Flags::SELF_DESCRIBE;
        }
        if self.deterministic {
            options.flags |= Flags::CDE;
        }
        if self.string_ref {
            options.string_ref = StringRef::On;
        }

        let data = cbor_codec::encode(&json_to_value(json), &options)
            .context("Failed to encode CBOR")?;
        debug!("Encoded {} bytes", data.len());

        self.output.unwrap_or(Output::Stdout).write_all(&data)
    }
}

/// Convert a JSON value to a native CBOR value
fn json_to_value(json: serde_json::Value) -> Value {
    use serde_json::Value as J;

    match json {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(b),
        J::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::from(u)
            } else if let Some(i) = n.as_i64() {
                Value::from(i)
            } else {
                Value::Float64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        J::String(s) => Value::string(s),
        J::Array(items) => items.into_iter().map(json_to_value).collect(),
        J::Object(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::string(k), json_to_value(v)))
                .collect(),
        ),
    }
}
