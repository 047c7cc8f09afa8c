use clap::Parser;
use frog::Client;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "frog-client")]
#[command(about = "Sends one HTTP request and prints the response", long_about = None)]
struct Cli {
    /// Server address as host[:port]
    #[arg(long, default_value = "localhost:8080")]
    host: String,

    /// Request method, e.g. GET or POST
    method: String,

    /// Request path, e.g. /id/12358
    path: String,

    /// Request body
    body: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "frog=warn".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut client = Client::new(&cli.host)?;

    let body = cli.body.unwrap_or_default();
    let response = client
        .request(&cli.method, &cli.path, body.as_bytes(), &[])
        .await?;

    println!("HTTP/{} {}", response.http_version, response.status_code);
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    println!();
    println!("{}", response.text());

    Ok(())
}
