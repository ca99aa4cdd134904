// Library exports for the coverflow crate
// The binary and the integration tests both build the server from here

pub mod config;
pub mod deck;
pub mod error;
pub mod handlers;
pub mod navigation;
pub mod store;
pub mod tree;

use rocket::{catchers, routes};
use rocket_dyn_templates::Template;

// Re-export commonly used types
pub use config::Config;
pub use deck::{Cover, CoverDraft, CoverUpdate, CoverUpsert, Deck, IdPolicy, Music};
pub use error::{AppError, Result};
pub use navigation::DeckView;
pub use store::{DeckStore, Library, TreeStore};
pub use tree::{normalize, Node, NodeKind, TreeDocument};

/// Assemble the server with every route mounted.
pub fn build_rocket(config: Config) -> rocket::Rocket<rocket::Build> {
    rocket::build()
        .manage(Library::new(config))
        .mount("/", routes![
            // Deck
            handlers::list_covers,
            handlers::replace_covers,
            handlers::save_cover,
            handlers::delete_cover,

            // Content tree
            handlers::get_assets,
            handlers::replace_assets,
            handlers::insert_asset_node,
            handlers::remove_asset_node,

            // Pages
            handlers::carousel,
            handlers::admin_page,

            handlers::health_check,
        ])
        .register("/", catchers![
            handlers::bad_request,
            handlers::not_found,
            handlers::unprocessable,
            handlers::server_error,
        ])
        .attach(Template::fairing())
}
