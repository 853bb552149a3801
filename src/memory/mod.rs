pub mod content;
pub mod helix;
pub mod ids;
pub mod index;
pub mod local;
pub mod models;
pub mod stats;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use tracing::info;

pub use helix::HelixIndex;
pub use index::{IndexError, IndexFilter, IndexedDecision, SearchHit, SemanticIndex};
pub use local::LocalIndex;
pub use models::{DecisionInput, DecisionRecord, HistoryEntry, Recommendation, UserStats};
pub use store::{DecisionMemory, MemoryError, DEFAULT_HISTORY_LIMIT, STATS_HISTORY_LIMIT};

use crate::core::{UmbrellaConfig, UmbrellaError};
use crate::db::HelixClient;

/// Builds the collection named by `index_backend`.
pub fn open_index(config: &UmbrellaConfig) -> Result<Arc<dyn SemanticIndex>, UmbrellaError> {
    let index: Arc<dyn SemanticIndex> = match config.index_backend.as_str() {
        "local" => Arc::new(LocalIndex::open(config.collection_path())?),
        "memory" => Arc::new(LocalIndex::in_memory()),
        "helix" => Arc::new(HelixIndex::new(
            HelixClient::new(&config.helix_host, config.helix_port),
            config.collection_name.clone(),
        )),
        other => {
            return Err(UmbrellaError::Config(format!("Unknown index backend: {}", other)));
        }
    };
    info!("Opened {} index", index.name());
    Ok(index)
}
