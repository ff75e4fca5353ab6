#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let code = shellexec_cli::run().await?;

    // process::exit skips destructors, so flush what the child wrote first
    use std::io::{self, Write};
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    std::process::exit(code)
}
