//! Modules bundled with the bot

pub mod ping;
pub mod presence;

use crate::infrastructure::modules::ModuleCatalog;

/// Add every bundled module to the catalog
pub fn register_builtin(catalog: &mut ModuleCatalog) {
    catalog.register(ping::NAME, ping::factory);
    catalog.register(presence::NAME, presence::factory);
}
