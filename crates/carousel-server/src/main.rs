//! Carousel — product image selection server for carousel posts.

use std::path::PathBuf;
use std::sync::Arc;

use carousel_core::CarouselConfig;
use carousel_store::SqliteCatalog;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("CAROUSEL_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn print_help() {
    println!("Carousel — product image selection for carousel posts");
    println!();
    println!("Usage: carousel [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Start the server");
    println!("  import <catalog.json>    Upsert tagged items into the local catalog");
    println!("  tags [folder]            List catalog tags");
    println!("  select <topic...>        Run one selection and print the result");
    println!("  help                     Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "import" => {
                if args.len() < 3 {
                    eprintln!("Usage: carousel import <catalog.json>");
                    std::process::exit(1);
                }
                let config = CarouselConfig::from_env(resolve_data_dir())?;
                let catalog = SqliteCatalog::open(&config.data_paths.catalog)?;
                let report = catalog.import_json_file(&PathBuf::from(&args[2]))?;
                println!("Upserted {} items, {} failed", report.upserted, report.failed);
                for error in &report.errors {
                    println!("  {}", error);
                }
                std::process::exit(if report.failed == 0 { 0 } else { 1 });
            }
            "tags" => {
                let state = AppState::from_config(CarouselConfig::from_env(resolve_data_dir())?)?;
                let tags = state.catalog.available_tags(args.get(2).map(String::as_str)).await?;
                for tag in tags {
                    match carousel_select::Vocabulary::dimension_of(&tag) {
                        Some(dimension) => println!("{:<24} {}", tag, dimension),
                        None => println!("{}", tag),
                    }
                }
                return Ok(());
            }
            "select" => {
                let topic = args[2..].join(" ");
                if topic.trim().is_empty() {
                    eprintln!("Usage: carousel select <topic...>");
                    std::process::exit(1);
                }
                let state = AppState::from_config(CarouselConfig::from_env(resolve_data_dir())?)?;
                let images = state.selector.select_products(&topic).await?;
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "images": images }))?);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'carousel help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = CarouselConfig::from_env(&data_dir)?;
    let port = config.port;
    info!(
        "Storage: {}, catalog: {}, fallback folder: {}",
        config.storage.name(),
        config.catalog.name(),
        config.selection.fallback_folder
    );

    let state = Arc::new(AppState::from_config(config)?);
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Carousel server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
