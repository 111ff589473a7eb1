use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Operator CLI for the dict-bridge admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8090")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregated health of the counterparty, signer, breaker and certificate
    Status,
    /// Circuit breaker state and lifetime counters
    Circuit,
    /// Force the circuit breaker back to closed
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => client.get(format!("{base}/health")).send().await?,
        Commands::Circuit => {
            client
                .get(format!("{base}/admin/circuit"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Reset => {
            client
                .post(format!("{base}/admin/circuit/reset"))
                .headers(headers)
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // /health answers 503 with a full report when unhealthy
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if !text.is_empty() => println!("{text}"),
        Err(_) => {}
    }

    if !status.is_success() {
        eprintln!("Error: admin API returned status {status}");
        std::process::exit(1);
    }
    Ok(())
}
