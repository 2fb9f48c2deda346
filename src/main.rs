use clap::Parser;
use shacl_transformer::{
    cli::{self, Cli},
    logging,
};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    logging::init_tracing();
    if let Err(err) = cli::run(cli).await {
        tracing::debug!(error = ?err, "Command failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
