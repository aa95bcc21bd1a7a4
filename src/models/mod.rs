use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One rental listing scraped from a search-results page.
///
/// `link` is the identity key: the store keeps at most one row per link.
/// All text fields default to an empty string when the markup carries no
/// matching element; the extractor drops listings without a title before
/// they ever leave it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    /// Free-text price, kept only when currency-qualified ("25 000 ₽ в месяц").
    pub price: String,
    /// "Залог {amount}" or empty.
    pub deposit: String,
    /// "Комиссия {percent}" or empty.
    pub commission: String,
    /// "ЖКУ включены" or empty.
    pub utilities: String,
    pub address: String,
    /// At most 500 characters plus a "..." marker when truncated.
    pub description: String,
    /// Up to 3 absolute image URLs, page order, no duplicates.
    pub images: Vec<String>,
    pub link: String,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            price: String::new(),
            deposit: String::new(),
            commission: String::new(),
            utilities: String::new(),
            address: String::new(),
            description: String::new(),
            images: Vec::new(),
            link: String::new(),
            scraped_at: Utc::now(),
        }
    }
}

impl Default for Listing {
    fn default() -> Self {
        Self::new()
    }
}

/// A persisted listing row, as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredListing {
    pub id: i64,
    pub title: String,
    pub price: String,
    pub deposit: String,
    pub commission: String,
    pub utilities: String,
    pub address: String,
    pub description: String,
    pub images: Vec<String>,
    pub link: String,
    /// Nullable: rows written before the column existed carry no timestamp.
    pub scraped_at: Option<DateTime<Utc>>,
}

/// Compact row for "latest listings" views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: String,
    pub price: String,
    pub address: String,
    pub image_count: usize,
    pub link: String,
}

/// Counters for one extract-and-persist pass. Zeroed at the start of each
/// run and returned by value; never shared between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_processed: u32,
    pub new_items: u32,
    pub existing_items: u32,
    pub errors: u32,
}
