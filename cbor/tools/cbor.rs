/*!
CBOR Tools - A CLI for working with CBOR data

# Commands

- `inspect`: Display CBOR data as diagnostic notation, JSON or hex
- `compose`: Convert JSON to CBOR binary

# Examples

```bash
# Inspect a CBOR file as diagnostic notation
cbor inspect data.cbor

# One item per line, indented
cbor inspect --indent 2 data.cbor

# Inspect a CBOR sequence
cbor inspect --sequence log.cbor

# Inspect as JSON (lossy)
cbor inspect --format json data.cbor

# Convert JSON to CBOR with string references
echo '[{"name": "Alice"}, {"name": "Bob"}]' | cbor compose --string-ref -o data.cbor
```
*/

use clap::{Parser, Subcommand};

mod compose;
mod inspect;
mod io;

/// A CLI tool for working with CBOR data
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "A CLI tool for inspecting and composing CBOR data",
    long_about = "CBOR Tools provides utilities for working with CBOR (Concise Binary Object Representation) data.\n\n\
                  Features:\n\
                  - Inspect CBOR data as extended diagnostic notation, JSON or hex\n\
                  - Compose CBOR from JSON, optionally with string references\n\
                  - Codec options loaded from JSON files"
)]
struct Cli {
    /// Log level written to stderr
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    log_level: tracing_subscriber::filter::LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect and display CBOR data in various formats
    Inspect(inspect::Command),

    /// Convert JSON to CBOR binary
    Compose(compose::Command),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .with_target(
            cli.log_level
                > tracing_subscriber::filter::LevelFilter::from_level(tracing::Level::INFO),
        )
        .init();

    match cli.command {
        Commands::Inspect(args) => args.exec(),
        Commands::Compose(args) => args.exec(),
    }
}
