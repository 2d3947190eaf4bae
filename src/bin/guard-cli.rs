use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for the request security pipeline", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show monitor statistics
    Stats,
    /// Check whether an IP is currently suspicious
    CheckIp { ip: String },
    /// Manually ingest a security event
    LogEvent {
        /// Event type, e.g. UNAUTHORIZED_ACCESS
        #[arg(long = "type")]
        kind: String,
        /// Severity: LOW, MEDIUM, HIGH or CRITICAL
        #[arg(long)]
        severity: String,
        #[arg(long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Stats => {
            let res = client
                .get(format!("{}/security/stats", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::CheckIp { ip } => {
            let res = client
                .get(format!("{}/security/check-ip/{}", cli.url, ip))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::LogEvent {
            kind,
            severity,
            message,
        } => {
            let res = client
                .post(format!("{}/security/log-event", cli.url))
                .headers(headers)
                .json(&serde_json::json!({
                    "type": kind,
                    "severity": severity,
                    "message": message,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
