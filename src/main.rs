// src/main.rs - coverflow server entry point

use rocket::launch;

use coverflow::Config;

#[launch]
fn rocket() -> rocket::Rocket<rocket::Build> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    log::info!("============================================================");
    log::info!("coverflow - cover deck and content tree store");
    log::info!("Data directory: {}", config.data_dir.display());
    log::info!("Cover id policy: {:?}", config.id_policy);
    log::info!("============================================================");

    if !config.data_dir.exists() {
        if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
            log::error!("Failed to create data directory {}: {}", config.data_dir.display(), e);
        }
    }

    coverflow::build_rocket(config)
}
