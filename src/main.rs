use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use log::LevelFilter;
use serde::Serialize;
use spam_scores::{
    ClassificationResult, ConfigStore, LogSink, MessageProcessor, StoredConfig, TomlFileStore,
};
use std::io::Read;
use std::process;
use std::sync::Arc;

#[derive(Serialize)]
struct MessageReport<'a> {
    message: &'a str,
    #[serde(flatten)]
    result: Option<&'a ClassificationResult>,
}

#[tokio::main]
async fn main() {
    let matches = Command::new("spam-scores")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Classify messages by the spam score their scanners left in the headers")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration and learned-header store")
                .default_value(TomlFileStore::default_path()),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("show-learned")
                .long("show-learned")
                .help("List learned MailScanner headers")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print one JSON object per message")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("messages")
                .value_name("MESSAGE")
                .help("Raw message files, - for stdin")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        if let Err(e) = generate_default_config(path).await {
            eprintln!("Error generating configuration: {e:#}");
            process::exit(1);
        }
        println!("Default configuration written to: {path}");
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(TomlFileStore::default_path());
    let store = Arc::new(TomlFileStore::new(config_path));

    if matches.get_flag("show-learned") {
        match store.load().await {
            Ok(config) => {
                let learned = &config.custom_mailscanner_headers;
                if learned.is_empty() {
                    println!("No MailScanner headers learned yet");
                }
                for name in learned.iter() {
                    println!("{name}");
                }
            }
            Err(e) => {
                eprintln!("Error loading configuration: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let messages: Vec<String> = matches
        .get_many::<String>("messages")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if messages.is_empty() {
        eprintln!("No messages given");
        process::exit(2);
    }

    let processor = MessageProcessor::new(store, Arc::new(LogSink));
    processor.init().await;

    let json = matches.get_flag("json");
    let mut handles = Vec::new();
    for message in messages {
        let processor = processor.clone();
        handles.push(tokio::spawn(async move {
            let raw = read_message(&message).await?;
            let result = processor.process_message(&message, &raw).await;
            anyhow::Ok((message, result))
        }));
    }

    let mut failed = false;
    for handle in handles {
        match handle.await {
            Ok(Ok((message, result))) => print_result(&message, result.as_ref(), json),
            Ok(Err(e)) => {
                eprintln!("{e:#}");
                failed = true;
            }
            Err(e) => {
                eprintln!("Message task failed: {e}");
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

async fn generate_default_config(path: &str) -> anyhow::Result<()> {
    TomlFileStore::new(path)
        .save(&StoredConfig::generated())
        .await
        .with_context(|| format!("Failed to write {path}"))
}

async fn read_message(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        return tokio::task::spawn_blocking(|| {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read message from stdin")?;
            anyhow::Ok(raw)
        })
        .await?;
    }

    let bytes = tokio::fs::read(source)
        .await
        .with_context(|| format!("Failed to read message: {source}"))?;
    // Headers are 7-bit in practice; don't reject a message over a stray byte in the body
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn print_result(message: &str, result: Option<&ClassificationResult>, json: bool) {
    if json {
        let report = MessageReport { message, result };
        match serde_json::to_string(&report) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("{message}: failed to encode result: {e}"),
        }
        return;
    }

    match result {
        Some(result) => println!("{message}: {} ({})", result.tooltip, result.verdict),
        None => println!("{message}: no score"),
    }
}
