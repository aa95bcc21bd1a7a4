use tracing::{info, warn};

use crate::extract::SiteExtractor;
use crate::models::RunStats;
use crate::store::ListingStore;

/// One extract-and-persist pass over a page of markup.
///
/// Per-record problems are counted, never raised: the run always comes
/// back with a [`RunStats`]. Each existence check plus upsert stands on
/// its own against the database; there is no transaction across records,
/// so a reader may safely interleave with a running pass.
pub struct Processor<E: SiteExtractor> {
    extractor: E,
    store: ListingStore,
}

impl<E: SiteExtractor> Processor<E> {
    pub fn new(extractor: E, store: ListingStore) -> Self {
        Self { extractor, store }
    }

    /// Extract every listing from `html` and persist the new ones.
    /// `url` identifies the source page in the logs only.
    pub async fn process_html(&self, html: &str, url: &str) -> RunStats {
        let mut stats = RunStats::default();

        info!(site = self.extractor.site_name(), source = url, "processing page");
        let listings = self.extractor.extract(html);
        info!(found = listings.len(), "extracted listings");

        for listing in &listings {
            stats.total_processed += 1;

            if listing.link.is_empty() {
                warn!(title = %listing.title, "listing has no link, skipping");
                stats.errors += 1;
                continue;
            }

            match self.store.exists(&listing.link).await {
                Ok(true) => stats.existing_items += 1,
                Ok(false) => match self.store.upsert(listing).await {
                    Ok(()) => stats.new_items += 1,
                    Err(e) => {
                        warn!(link = %listing.link, "failed to save listing: {e:#}");
                        stats.errors += 1;
                    }
                },
                Err(e) => {
                    warn!(link = %listing.link, "existence check failed: {e:#}");
                    stats.errors += 1;
                }
            }
        }

        info!(
            total = stats.total_processed,
            new = stats.new_items,
            existing = stats.existing_items,
            errors = stats.errors,
            "run complete"
        );
        stats
    }

    /// The underlying store, for the reporting side (recent/page/by_id/count).
    pub fn store(&self) -> &ListingStore {
        &self.store
    }
}
