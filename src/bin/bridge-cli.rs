use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Command-line client for the engine bridge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the bridge is up
    Health,
    /// Ask one question on a fresh engine connection
    Chat { message: String },
    /// Open a session, send each message in order, then close it
    Session {
        #[arg(required = true)]
        messages: Vec<String>,
    },
    /// Start a background job
    Job { message: String },
    /// Show the status of a background job
    JobStatus { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Chat { message } => {
            let res = client
                .post(format!("{}/api/chat", base))
                .json(&json!({ "message": message }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Session { messages } => {
            let res = client.post(format!("{}/api/chat/session", base)).send().await?;
            let Some(opened) = print_response(res).await? else {
                return Ok(());
            };
            let Some(session_id) = opened.get("sessionId").and_then(Value::as_str).map(str::to_string) else {
                eprintln!("Error: no sessionId in response");
                return Ok(());
            };

            for message in messages {
                println!("> {}", message);
                let res = client
                    .post(format!("{}/api/chat/{}/message", base, session_id))
                    .json(&json!({ "message": message }))
                    .send()
                    .await?;
                if print_response(res).await?.is_none() {
                    break;
                }
            }

            let res = client.delete(format!("{}/api/chat/{}", base, session_id)).send().await?;
            print_response(res).await?;
        }
        Commands::Job { message } => {
            let res = client
                .post(format!("{}/api/chat/polling", base))
                .json(&json!({ "message": message }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::JobStatus { id } => {
            let res = client.get(format!("{}/api/jobs/{}", base, id)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Pretty-print a JSON response. Returns the body on success.
async fn print_response(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: bridge returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(None);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(Some(json))
}
