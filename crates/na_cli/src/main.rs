use clap::Parser;
use na_core::{NewsStore, Result};
use na_crew::Crew;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, default_value = "sqlite")]
    storage: String,
    /// SQLite database path
    #[arg(long, default_value = "news.db")]
    db: PathBuf,
    #[arg(long, default_value = "gpt-4o-mini", help = "Chat model for article generation. Use `dummy` for offline runs.")]
    model: String,
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: Option<String>,
    /// OpenAI-compatible API base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Directory generated images are stored under and served from
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the web service
    Serve {
        #[arg(long, default_value = "0.0.0.0:5000")]
        listen: String,
    },
    /// Generate one article from the command line
    Generate {
        #[arg(long)]
        topic: String,
        /// Source URLs, comma separated
        #[arg(long, value_delimiter = ',')]
        urls: Vec<String>,
        /// Write the raw generation output to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Manage training jobs on the Ray cluster
    Train {
        #[command(subcommand)]
        command: TrainCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
enum TrainCommands {
    /// Stage job files and submit a training job
    Submit {
        #[arg(long, default_value = "ray_training_config.yaml")]
        config: PathBuf,
        /// Directory the job scripts live in
        #[arg(long, default_value = ".")]
        scripts: PathBuf,
    },
    Status {
        #[arg(long, default_value = "ray_training_config.yaml")]
        config: PathBuf,
        job_id: String,
    },
    Logs {
        #[arg(long, default_value = "ray_training_config.yaml")]
        config: PathBuf,
        job_id: String,
    },
    Stop {
        #[arg(long, default_value = "ray_training_config.yaml")]
        config: PathBuf,
        job_id: String,
    },
}

async fn check_storage(store: &Arc<dyn NewsStore>, storage_type: &str) -> Result<()> {
    // A read against a nonexistent user exercises the backend end to end
    store.list_articles(0).await?;
    info!("🏦 Storage backend initialized successfully (using {})", storage_type);
    Ok(())
}

fn build_crew(cli: &Cli) -> Result<Arc<Crew>> {
    let config = na_crew::Config {
        model_name: cli.model.clone(),
        api_key: cli.api_key.clone(),
        base_url: cli.base_url.clone(),
        image_dir: cli.static_dir.clone(),
    };
    let model = na_crew::create_model(&config)?;
    info!("🧠 Generation model initialized successfully (using {})", model.name());
    Ok(Arc::new(Crew::new(model, &config)))
}

fn launcher_for(config_path: &std::path::Path, scripts: Option<&PathBuf>) -> Result<na_train::Launcher> {
    let config = na_train::TrainConfig::load(config_path)?;
    let scripts = scripts.cloned().unwrap_or_else(|| PathBuf::from("."));
    Ok(na_train::Launcher::new(config, scripts))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { listen } => {
            let store = na_storage::create_store(&cli.storage, Some(&cli.db)).await?;
            info!("💾 Checking storage connection...");
            check_storage(&store, &cli.storage).await?;

            na_web::auth::ensure_default_admin(&store).await?;

            let crew = build_crew(&cli)?;
            let state = na_web::AppState::new(store, crew, &cli.static_dir);
            let app = na_web::create_app(state).await;

            let listener = tokio::net::TcpListener::bind(listen).await?;
            info!("🌐 Listening on {}", listen);
            axum::serve(listener, app).await.map_err(na_core::Error::Io)?;
        }
        Commands::Generate { topic, urls, output } => {
            let crew = build_crew(&cli)?;
            info!("📰 Generating article on: {}", topic);
            let raw = crew.generate(urls, topic, None).await?;
            match output {
                Some(path) => {
                    std::fs::write(path, &raw)?;
                    info!("✅ Wrote generation output to {}", path.display());
                }
                None => println!("{}", raw),
            }
        }
        Commands::Train { command } => match command {
            TrainCommands::Submit { config, scripts } => {
                let launcher = launcher_for(config, Some(scripts))?;
                let job_id = launcher.launch().await?;
                println!("{}", job_id);
            }
            TrainCommands::Status { config, job_id } => {
                let launcher = launcher_for(config, None)?;
                let status = launcher.status(job_id).await?;
                println!("{}", status.as_str());
            }
            TrainCommands::Logs { config, job_id } => {
                let launcher = launcher_for(config, None)?;
                print!("{}", launcher.logs(job_id).await?);
            }
            TrainCommands::Stop { config, job_id } => {
                let launcher = launcher_for(config, None)?;
                launcher.stop(job_id).await?;
            }
        },
    }

    Ok(())
}
