#![deny(clippy::all)]

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use regkit_core::{RegPath, ValueData};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Typed client for the Windows registry",
    disable_help_subcommand = true
)]
struct RegkitCli {
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v", global = true)]
    trace: bool,
    #[arg(long, help = "Emit JSON instead of human output", global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether a key exists.
    Exists { path: String },
    /// Create a key, making any missing ancestors.
    Create { path: String },
    /// Delete a key.
    Delete {
        path: String,
        /// Delete subkeys first, depth-first.
        #[arg(long)]
        recurse: bool,
    },
    /// List the subkeys of a key.
    Keys { path: String },
    /// List the values attached to a key.
    Values { path: String },
    /// Read one value.
    Get { path: String, name: String },
    /// Write one value.
    Set {
        path: String,
        name: String,
        /// Payload: text, a decimal/0x integer, or hex bytes,
        /// depending on --type.
        data: String,
        #[arg(long = "type", value_enum, default_value = "string")]
        ty: TypeArg,
    },
    /// Delete one value.
    Unset { path: String, name: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TypeArg {
    String,
    Expand,
    Dword,
    Binary,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = RegkitCli::parse();
    init_tracing(cli.trace, cli.verbose);
    match run(&cli) {
        // JSON consumers get failures in the same envelope shape as
        // successes, not a human-oriented report.
        Err(err) if cli.json => {
            println!(
                "{}",
                serde_json::json!({"status": "error", "error": format!("{err:#}")})
            );
            std::process::exit(1);
        }
        result => result,
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("regkit_core={level},regkit={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn parse_payload(data: &str, ty: TypeArg) -> Result<ValueData> {
    Ok(match ty {
        TypeArg::String => ValueData::String(data.to_string()),
        TypeArg::Expand => ValueData::ExpandingString(data.to_string()),
        TypeArg::Dword => {
            let word = match data.strip_prefix("0x") {
                Some(digits) => u32::from_str_radix(digits, 16),
                None => data.parse(),
            }
            .map_err(|_| eyre!("'{data}' is not a 32-bit integer"))?;
            ValueData::Dword(word)
        }
        TypeArg::Binary => {
            ValueData::Binary(hex::decode(data).map_err(|err| eyre!("bad hex payload: {err}"))?)
        }
    })
}

#[cfg(windows)]
fn run(cli: &RegkitCli) -> Result<()> {
    use regkit_core::Registry;
    use serde_json::json;

    let reg = Registry::native();
    match &cli.command {
        Command::Exists { path } => {
            let key = RegPath::parse(path)?;
            let exists = reg.key_exists(&key)?;
            emit(
                cli,
                json!({"path": key.to_string(), "exists": exists}),
                &exists.to_string(),
            );
        }
        Command::Create { path } => {
            let key = RegPath::parse(path)?;
            reg.create_key(&key)?;
            emit(cli, json!({"path": key.to_string()}), &format!("created {key}"));
        }
        Command::Delete { path, recurse } => {
            let key = RegPath::parse(path)?;
            reg.delete_key(&key, *recurse)?;
            emit(cli, json!({"path": key.to_string()}), &format!("deleted {key}"));
        }
        Command::Keys { path } => {
            let key = RegPath::parse(path)?;
            let mut keys = Vec::new();
            for subkey in reg.subkeys(&key)? {
                keys.push(subkey?.to_string());
            }
            if cli.json {
                println!("{}", json!({"status": "ok", "details": {"keys": keys}}));
            } else {
                for name in &keys {
                    println!("{name}");
                }
            }
        }
        Command::Values { path } => {
            let key = RegPath::parse(path)?;
            let mut rows = Vec::new();
            for value in reg.values(&key)? {
                let value = value?;
                let Some(data) = value.data().cloned() else {
                    continue;
                };
                rows.push((value.name().to_string(), data));
            }
            if cli.json {
                let details: Vec<_> = rows
                    .iter()
                    .map(|(name, data)| {
                        let mut entry = data_json(data);
                        entry["name"] = json!(name);
                        entry
                    })
                    .collect();
                println!("{}", json!({"status": "ok", "details": {"values": details}}));
            } else {
                for (name, data) in &rows {
                    println!("{:<30} {:<14} {}", name, type_label(data), render_data(data));
                }
            }
        }
        Command::Get { path, name } => {
            let key = RegPath::parse(path)?;
            let data = reg.value(&key, name.clone()).get()?;
            if cli.json {
                let mut entry = data_json(&data);
                entry["path"] = json!(key.to_string());
                entry["name"] = json!(name);
                println!("{}", json!({"status": "ok", "details": entry}));
            } else {
                println!("{}", render_data(&data));
            }
        }
        Command::Set { path, name, data, ty } => {
            let key = RegPath::parse(path)?;
            let payload = parse_payload(data, *ty)?;
            reg.value(&key, name.clone()).set(payload)?;
            emit(
                cli,
                json!({"path": key.to_string(), "name": name}),
                &format!("set '{name}' under {key}"),
            );
        }
        Command::Unset { path, name } => {
            let key = RegPath::parse(path)?;
            reg.value(&key, name.clone()).delete()?;
            emit(
                cli,
                json!({"path": key.to_string(), "name": name}),
                &format!("deleted '{name}' under {key}"),
            );
        }
    }
    Ok(())
}

// Argument problems must surface identically on every host, so paths
// and payloads are still parsed before refusing to touch a store that
// does not exist here.
#[cfg(not(windows))]
fn run(cli: &RegkitCli) -> Result<()> {
    match &cli.command {
        Command::Exists { path }
        | Command::Create { path }
        | Command::Keys { path }
        | Command::Values { path }
        | Command::Delete { path, .. }
        | Command::Get { path, .. }
        | Command::Unset { path, .. } => {
            RegPath::parse(path)?;
        }
        Command::Set { path, data, ty, .. } => {
            RegPath::parse(path)?;
            parse_payload(data, *ty)?;
        }
    }
    Err(eyre!("this host has no native registry; regkit needs Windows"))
}

#[cfg(windows)]
fn emit(cli: &RegkitCli, details: serde_json::Value, human: &str) {
    if cli.json {
        println!("{}", serde_json::json!({"status": "ok", "details": details}));
    } else if !human.is_empty() {
        println!("{human}");
    }
}

#[cfg(windows)]
fn type_label(data: &ValueData) -> String {
    match data {
        ValueData::Unknown { kind, .. } => format!("type-{kind}"),
        _ => data
            .value_type()
            .map(|ty| ty.as_str().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(windows)]
fn render_data(data: &ValueData) -> String {
    match data {
        ValueData::String(s) | ValueData::ExpandingString(s) => s.clone(),
        ValueData::Binary(bytes) => hex::encode(bytes),
        ValueData::Dword(word) => format!("{word} (0x{word:08x})"),
        ValueData::Unknown { bytes, .. } => hex::encode(bytes),
    }
}

#[cfg(windows)]
fn data_json(data: &ValueData) -> serde_json::Value {
    use serde_json::json;

    match data {
        ValueData::String(s) => json!({"type": "string", "data": s}),
        ValueData::ExpandingString(s) => json!({"type": "expand-string", "data": s}),
        ValueData::Binary(bytes) => json!({"type": "binary", "data": hex::encode(bytes)}),
        ValueData::Dword(word) => json!({"type": "dword", "data": word}),
        ValueData::Unknown { kind, bytes } => {
            json!({"type": kind, "data": hex::encode(bytes)})
        }
    }
}
