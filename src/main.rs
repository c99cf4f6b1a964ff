use clap::Parser;
use env_logger::Env;
use thesis_distribution::cli::Cli;
use thesis_distribution::config::AppConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str())).init();

    if let Err(err) = cli.run(config).await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}
