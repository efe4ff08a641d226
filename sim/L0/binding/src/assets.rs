//! Asset deduplication.
//!
//! Entities are built independently, so two mesh colliders pointing at the
//! same file both produce a mesh asset. The deduplicator merges every
//! candidate into one list in which each asset name and each source file
//! appears once; the first occurrence in build order wins.

use hashbrown::HashSet;
use tracing::{debug, warn};

use crate::resource::ResourceElement;

/// Order-stable asset merger.
#[derive(Debug, Clone, Default)]
pub struct AssetDeduplicator {
    names: HashSet<String>,
    files: HashSet<String>,
    assets: Vec<ResourceElement>,
}

impl AssetDeduplicator {
    /// Create an empty deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate. Returns `true` if it was appended.
    pub fn offer(&mut self, asset: ResourceElement) -> bool {
        let Some(name) = asset.name().map(str::to_owned) else {
            warn!(tag = asset.tag(), "asset without a name dropped");
            return false;
        };
        if self.names.contains(&name) {
            debug!(asset = %name, "asset name already registered");
            return false;
        }
        let file = asset.text("file").map(str::to_owned);
        if let Some(file) = &file {
            if self.files.contains(file) {
                debug!(asset = %name, file = %file, "asset file already registered");
                return false;
            }
        }

        self.names.insert(name);
        if let Some(file) = file {
            self.files.insert(file);
        }
        self.assets.push(asset);
        true
    }

    /// Offer every candidate in order.
    pub fn offer_all(&mut self, assets: impl IntoIterator<Item = ResourceElement>) {
        for asset in assets {
            self.offer(asset);
        }
    }

    /// Merged assets so far.
    #[must_use]
    pub fn assets(&self) -> &[ResourceElement] {
        &self.assets
    }

    /// Consume into the merged list.
    #[must_use]
    pub fn into_assets(self) -> Vec<ResourceElement> {
        self.assets
    }

    /// Merge a candidate list in one call.
    #[must_use]
    pub fn merge(assets: impl IntoIterator<Item = ResourceElement>) -> Vec<ResourceElement> {
        let mut dedup = Self::new();
        dedup.offer_all(assets);
        dedup.into_assets()
    }
}
