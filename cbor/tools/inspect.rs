/*!
Inspect command - display CBOR data in various formats
*/

use super::io::{self, Input, Output};
use anyhow::Context;
use base64::prelude::*;
use cbor_codec::{DecodeOptions, Decoder, Flags, Indent, Value, edn};
use clap::Parser;
use std::path::PathBuf;
use tracing::*;

/// Inspect and display CBOR data
#[derive(Parser, Debug)]
#[command(about = "Inspect and display CBOR information", long_about = None)]
pub struct Command {
    /// Output format
    #[arg(
        long,
        default_value = "diag",
        value_name = "FORMAT",
        help = "Output format: diag/diagnostic (EDN, human-readable), json (lossy), hex"
    )]
    format: OutputFormat,

    /// Spaces per nesting level for diagnostic output (one item per line)
    #[arg(long, value_name = "N")]
    indent: Option<u8>,

    /// Treat the input as a CBOR sequence and show every item
    #[arg(short = 's', long)]
    sequence: bool,

    /// JSON file with decode options
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<Output>,

    /// Input CBOR file (use '-' for stdin)
    input: Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    /// Extended diagnostic notation (human-readable, shows the encoding)
    #[value(alias = "diagnostic")]
    Diag,
    /// JSON format (lossy - loses CBOR tags, types, etc.)
    Json,
    /// Hexadecimal dump
    Hex,
}

impl Command {
    pub fn exec(self) -> anyhow::Result<()> {
        let data = self.input.read_all()?;
        debug!("Read {} bytes", data.len());

        let mut options = match &self.options {
            Some(path) => io::read_options::<DecodeOptions>(path)?,
            None => DecodeOptions::with_flags(Flags::TEXT | Flags::KEY_TEXT | Flags::INT_KEY),
        };
        if let Some(n) = self.indent {
            options.edn.indent = Indent::Spaces(n);
        }

        let mut output_text = match self.format {
            OutputFormat::Diag if self.sequence => {
                options.flags |= Flags::EDN;
                decode_all(&data, options)?
                    .into_iter()
                    .map(|v| v.as_str().map(str::to_owned).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            OutputFormat::Diag => edn::to_diagnostic(&data, &options)?,
            OutputFormat::Json if self.sequence => decode_all(&data, options)?
                .iter()
                .map(|v| serde_json::to_string_pretty(&value_to_json(v)))
                .collect::<Result<Vec<_>, _>>()?
                .join("\n"),
            OutputFormat::Json => {
                let value = cbor_codec::decode(&data, &options).context("Failed to decode CBOR")?;
                serde_json::to_string_pretty(&value_to_json(&value))?
            }
            OutputFormat::Hex => hex::encode(&data),
        };

        let output = self.output.unwrap_or(Output::Stdout);
        if matches!(output, Output::Stdout) {
            output_text.push('\n');
        }
        output.write_str(&output_text)
    }
}

/// Decodes every item of a CBOR sequence.
fn decode_all(data: &[u8], options: DecodeOptions) -> anyhow::Result<Vec<Value>> {
    let mut decoder = Decoder::new(options)?;
    decoder.add(data)?;

    let mut items = Vec::new();
    while decoder.process().context("Failed to decode CBOR")? {
        if let Some(value) = decoder.take_value() {
            items.push(value);
        }
    }
    if decoder.is_partial() {
        anyhow::bail!(
            "Truncated item after {} complete items ({} bytes left)",
            items.len(),
            decoder.get_buffer().len()
        );
    }
    Ok(items)
}

/// Convert a CBOR value to JSON (lossy)
fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as J;

    match value {
        Value::Unsigned(n) => J::from(*n),
        Value::Negative(n) => match i64::try_from(*n) {
            Ok(n) => J::from(-1 - n),
            Err(_) => J::String((-1 - *n as i128).to_string()),
        },
        Value::Bytes(b) => J::String(BASE64_URL_SAFE_NO_PAD.encode(b)),
        Value::Text(t) => J::String(String::from_utf8_lossy(t).into_owned()),
        Value::String(s) => match std::str::from_utf8(s) {
            Ok(s) => J::String(s.to_owned()),
            Err(_) => J::String(BASE64_URL_SAFE_NO_PAD.encode(s)),
        },
        Value::Array(items) => J::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => J::Object(
            entries
                .iter()
                .map(|(k, v)| (key_to_json(k), value_to_json(v)))
                .collect(),
        ),
        Value::Tag(_, content) => value_to_json(content),
        Value::Bool(b) => J::Bool(*b),
        // JSON doesn't have undefined
        Value::Null | Value::Undefined | Value::Custom(_) => J::Null,
        Value::Float16(_) | Value::Float32(_) | Value::Float64(_) => value
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(J::Null, J::Number),
        Value::DateTime(dt) => J::String(dt.to_string()),
        Value::BigNum(b) => match b.to_i128() {
            Some(n) => i64::try_from(n)
                .map(J::from)
                .or_else(|_| u64::try_from(n).map(J::from))
                .unwrap_or_else(|_| J::String(n.to_string())),
            None => J::String(format!(
                "{}0x{}",
                if b.is_negative() { "~" } else { "" },
                hex::encode(b.magnitude())
            )),
        },
        Value::Decimal(f) => J::String(format!("{}e{}", mantissa(&f.mantissa), f.exponent)),
        Value::BigFloat(f) => J::String(format!("{}p{}", mantissa(&f.mantissa), f.exponent)),
        Value::Uri(uri) => J::String(uri.clone()),
        Value::Shareable(content) => value_to_json(content),
        Value::Params(_, content) => value_to_json(content),
    }
}

fn mantissa(b: &cbor_codec::BigNum) -> String {
    match b.to_i128() {
        Some(n) => n.to_string(),
        None => format!("0x{}", hex::encode(b.magnitude())),
    }
}

/// JSON object keys must be strings
fn key_to_json(key: &Value) -> String {
    match value_to_json(key) {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
