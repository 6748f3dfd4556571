use anyhow::Context;
use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use critique_core::{
    config_from_lookup, markdown::ThreadMarkdown, ConversationId, ConversationStore, CoreConfig,
    CritiqueService, FileConversationStore, ReportRenderer, ResponseNormalizer,
};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "critique")]
#[command(about = "AI code review for Python scripts and notebooks on GitHub")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a .py or .ipynb file and print the report
    Analyze {
        /// GitHub URL of the file
        url: String,
    },
    /// Ask a follow-up question in an existing conversation
    Chat {
        /// Conversation id printed by `analyze`
        conversation_id: String,
        /// The question
        message: String,
    },
    /// Print a conversation
    History {
        /// Conversation id
        conversation_id: String,
    },
    /// List conversations, most recent first
    List,
    /// Normalise a raw backend response and print the report
    Normalize {
        /// File holding the response (reads stdin when omitted)
        file: Option<PathBuf>,
        /// Print the canonical record as JSON instead of the report
        #[arg(long)]
        json: bool,
    },
}

fn load_config() -> anyhow::Result<CoreConfig> {
    Ok(config_from_lookup(|name| std::env::var(name).ok())?)
}

fn read_input(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read stdin")?;
            Ok(raw)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("critique_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { url } => {
            let service = CritiqueService::from_config(&load_config()?)?;
            let outcome = service.analyze(&url).await?;
            println!("{}", outcome.report);
            println!();
            println!("Conversation ID: {}", outcome.conversation_id);
        }
        Commands::Chat {
            conversation_id,
            message,
        } => {
            let id = ConversationId::parse(&conversation_id)?;
            let service = CritiqueService::from_config(&load_config()?)?;
            println!("{}", service.chat(&id, &message).await?);
        }
        Commands::History { conversation_id } => {
            let id = ConversationId::parse(&conversation_id)?;
            let store = FileConversationStore::from_config(&load_config()?);
            let thread = store.get_thread(&id)?;
            println!("{}", ThreadMarkdown::new().history_render(&thread));
        }
        Commands::List => {
            let store = FileConversationStore::from_config(&load_config()?);
            let threads = store.list_threads()?;
            if threads.is_empty() {
                println!("No conversations found.");
            }
            for thread in threads {
                println!(
                    "ID: {}, Source: {}, Started: {}, Messages: {}",
                    thread.id,
                    thread.source_url,
                    thread.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    thread.message_count
                );
            }
        }
        Commands::Normalize { file, json } => {
            let raw = read_input(file)?;
            let (record, stage) = ResponseNormalizer::new().normalize_with_stage(&raw);
            tracing::info!("recovered via {} stage", stage);
            if json {
                println!("{}", record.to_wire_json()?);
            } else {
                println!("{}", ReportRenderer::new().render(&record));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_normalize_parses_json_flag() {
        let cli = Cli::try_parse_from(["critique", "normalize", "reply.txt", "--json"]).unwrap();
        match cli.command {
            Commands::Normalize { file, json } => {
                assert_eq!(file, Some(PathBuf::from("reply.txt")));
                assert!(json);
            }
            _ => panic!("expected normalize"),
        }
    }
}
