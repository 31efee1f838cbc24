use clap::Parser;

use docxlate::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    cli::init_tracing(args.log_json);

    if let Err(e) = cli::run(args).await {
        tracing::error!(error = %e, "docxlate failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
