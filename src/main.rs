use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = adsb_relay::cli::Cli::parse();
    if let Err(e) = adsb_relay::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
