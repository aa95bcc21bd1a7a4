use anyhow::{Context, Result};
use avito_scout::{AvitoExtractor, ListingStore, Processor};
use tracing::{info, Level};

const DEFAULT_DB_PATH: &str = "database/avito_apartments.db";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let page_path = args
        .next()
        .context("usage: avito-scout <page.html> [db-path]")?;
    let db_path = args.next().unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

    info!("🏠 Avito Scout - listing page processor");

    let html = tokio::fs::read_to_string(&page_path)
        .await
        .with_context(|| format!("failed to read {page_path}"))?;

    let store = ListingStore::open(&db_path).await?;
    let processor = Processor::new(AvitoExtractor::new()?, store);

    let stats = processor.process_html(&html, &page_path).await;

    println!("\n📈 Run statistics:");
    println!("   processed: {}", stats.total_processed);
    println!("   new:       {}", stats.new_items);
    println!("   existing:  {}", stats.existing_items);
    println!("   errors:    {}", stats.errors);

    let total = processor.store().count().await?;
    let recent = processor.store().recent(10).await?;

    println!("\n💾 {total} listings in {db_path}, latest:");
    for (i, item) in recent.iter().enumerate() {
        println!("{}. {} ({})", i + 1, item.title, item.price);
        if !item.address.is_empty() {
            println!("   {}", item.address);
        }
        println!("   {} photo(s) | {}", item.image_count, item.link);
    }

    Ok(())
}
