use tracing::{debug, error, info, warn};

use folio::file::{FileFilter, FileRepository};
use folio::folder::{FolderFilter, FolderRepository};
use folio::tag::{TagFilter, TagRepository};
use folio::{Config, Database, TagService};

async fn run(config: &Config) -> folio::Result<()> {
    let db = Database::open(&config.database.path).await?;
    let tags = TagService::new(&db).with_max_tree_depth(config.tags.max_tree_depth);

    if config.tags.seed_defaults {
        let report = tags.seed_defaults().await?;
        if !report.is_complete() {
            for skipped in &report.skipped {
                debug!(name = %skipped.name, reason = %skipped.reason, "Skipped default tag");
            }
        }
    }

    let folders = FolderRepository::new(db.pool())
        .count(&FolderFilter::new())
        .await?;
    let files = FileRepository::new(db.pool());
    let file_count = files.count(&FileFilter::new()).await?;
    let total_size = files.total_size(&FileFilter::new()).await?;
    let tag_count = TagRepository::new(db.pool())
        .count(&TagFilter::new())
        .await?;

    info!(
        folders,
        files = file_count,
        bytes = total_size,
        tags = tag_count,
        "Store ready"
    );

    let tree = tags.tree().await?;
    match serde_json::to_string_pretty(&tree) {
        Ok(json) => debug!("Tag tree:\n{json}"),
        Err(e) => warn!("Failed to render tag tree: {e}"),
    }

    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(2);
    }

    if let Err(e) = folio::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        folio::logging::init_console_only(&config.logging.level);
    }

    info!("Folio - hierarchical folder, file and tag store");
    info!("Database: {}", config.database.path);

    if let Err(e) = run(&config).await {
        error!("Startup failed: {e}");
        std::process::exit(1);
    }
}
