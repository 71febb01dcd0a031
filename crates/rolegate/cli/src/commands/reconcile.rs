//! Rewrite the persisted record in canonical form

use rolegate_store::AccessConfigStore;
use tracing::info;

use crate::error::CliResult;

pub fn execute(store: &AccessConfigStore) -> CliResult<()> {
    let loaded = store.load();
    let saved = store.save(&loaded)?;

    info!(location = %store.location(), version = saved.version, "Access config reconciled");
    println!(
        "Reconciled {}: {} role(s), {} marker(s), version {}",
        store.location(),
        saved.roles.len(),
        saved.markers.marker_count(),
        saved.version
    );
    Ok(())
}
