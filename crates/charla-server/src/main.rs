use clap::Parser;

mod server;

#[derive(Parser)]
#[command(name = "charla-server")]
#[command(about = "Relay server between the charla chat UI and a local Ollama instance")]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    port: u16,
    /// Base URL of the Ollama server
    #[arg(long, default_value = "http://localhost:11434")]
    ollama_url: String,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();
    server::startup(&cli.host, cli.port, &cli.ollama_url).await
}
