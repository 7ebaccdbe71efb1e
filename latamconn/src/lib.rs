// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    RunOptions, RunOutcome, asset_path, default_config_dir, execute_run, existing_assets,
    load_centroids, load_config, load_registry, resolve_path, write_default_assets,
};
