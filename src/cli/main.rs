use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde_json::json;

#[derive(Parser)]
#[command(name = "skillswap-search-cli")]
#[command(about = "SkillSwap Hub forum search CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "SKILLSWAP_ENDPOINT", default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search forums
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Create the search index if missing
    Setup {
        /// Drop the existing index and rebuild it from the forum store
        #[arg(short, long)]
        delete_existing: bool,
    },

    /// Repair drift between the forum store and the index
    Reconcile,

    /// Show index statistics
    Stats,

    /// Create a forum
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(short, long)]
        image: Option<String>,
    },

    /// List forums
    List {
        #[arg(short, long, default_value = "0")]
        page: u32,

        #[arg(short = 's', long, default_value = "20")]
        page_size: u32,
    },

    /// Get forum details
    Get {
        #[arg(value_name = "FORUM_ID")]
        id: String,
    },

    /// Delete a forum
    Delete {
        #[arg(value_name = "FORUM_ID")]
        id: String,
    },

    /// Check server health
    Health,
}

async fn print_body(response: Response) -> Result<()> {
    let status = response.status();
    let text = response.text().await.context("reading response body")?;

    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(body) => println!("{}", serde_json::to_string_pretty(&body)?),
        Err(_) => println!("{}", text),
    }

    if !status.is_success() {
        anyhow::bail!("request failed with status {}", status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let endpoint = cli.endpoint.trim_end_matches('/');

    let request = match cli.command {
        Commands::Search { query } => client
            .get(format!("{}/api/search", endpoint))
            .query(&[("q", query)]),

        Commands::Setup { delete_existing } => client
            .post(format!("{}/api/search/setup", endpoint))
            .json(&json!({ "delete_existing": delete_existing })),

        Commands::Reconcile => client.post(format!("{}/api/search/reconcile", endpoint)),

        Commands::Stats => client.get(format!("{}/api/search/stats", endpoint)),

        Commands::Create {
            title,
            description,
            image,
        } => client
            .post(format!("{}/api/forums", endpoint))
            .json(&json!({
                "title": title,
                "description": description,
                "image": image,
            })),

        Commands::List { page, page_size } => client
            .get(format!("{}/api/forums", endpoint))
            .query(&[("page", page), ("page_size", page_size)]),

        Commands::Get { id } => client.get(format!("{}/api/forums/{}", endpoint, id)),

        Commands::Delete { id } => client.delete(format!("{}/api/forums/{}", endpoint, id)),

        Commands::Health => client.get(format!("{}/health", endpoint)),
    };

    let response = request
        .send()
        .await
        .with_context(|| format!("connecting to {}", endpoint))?;

    print_body(response).await
}
