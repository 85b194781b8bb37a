#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = joineazy_rust::run().await {
        eprintln!("joineazy-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
