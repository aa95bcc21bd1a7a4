//! End-to-end tests: fixture markup through the extractor into an
//! in-memory SQLite store.

use avito_scout::{AvitoExtractor, Listing, ListingStore, Processor, RunStats};

fn card(i: usize) -> String {
    format!(
        r#"
        <div data-marker="item">
            <a data-marker="item-title" href="/ufa/kvartiry/flat-{i}">
                <h3>{i}-к. квартира, 40 м²</h3>
            </a>
            <span data-marker="item-price">2{i} 000 ₽ в месяц</span>
            <div data-marker="item-address">
                <a href="/catalog/houses/{i}">ул. Ленина</a>
                <a href="/ufa/kvartiry/dom-{i}">{i}</a>
            </div>
            <div data-marker="item-specific-params">Залог 15000 ₽, комиссия 50%, ЖКУ включены</div>
            <div class="photo-slider-list-item-r2YDC"><img src="//10.img.avito.st/{i}.jpg"></div>
        </div>
        "#
    )
}

fn page(cards: usize) -> String {
    let body: String = (1..=cards).map(card).collect();
    format!("<html><body>{body}</body></html>")
}

/// A card with a title but no usable link anchor.
fn linkless_card() -> &'static str {
    r#"
    <div data-marker="item">
        <h3 data-marker="item-title">Квартира без ссылки</h3>
        <span data-marker="item-price">10 000 ₽</span>
    </div>
    "#
}

fn listing(link: &str, title: &str) -> Listing {
    Listing {
        title: title.to_string(),
        price: "25 000 ₽ в месяц".to_string(),
        link: link.to_string(),
        ..Listing::new()
    }
}

async fn processor() -> Processor<AvitoExtractor> {
    let store = ListingStore::in_memory().await.unwrap();
    Processor::new(AvitoExtractor::new().unwrap(), store)
}

#[tokio::test]
async fn two_runs_over_the_same_page_are_idempotent() {
    let processor = processor().await;
    let html = page(5);

    let first = processor.process_html(&html, "https://www.avito.ru/test").await;
    assert_eq!(
        first,
        RunStats {
            total_processed: 5,
            new_items: 5,
            existing_items: 0,
            errors: 0,
        }
    );

    let second = processor.process_html(&html, "https://www.avito.ru/test").await;
    assert_eq!(
        second,
        RunStats {
            total_processed: 5,
            new_items: 0,
            existing_items: 5,
            errors: 0,
        }
    );

    assert_eq!(processor.store().count().await.unwrap(), 5);
}

#[tokio::test]
async fn listing_without_link_counts_as_error_and_is_not_persisted() {
    let processor = processor().await;
    let html = format!("<html><body>{}{}</body></html>", card(1), linkless_card());

    let stats = processor.process_html(&html, "test").await;
    assert_eq!(stats.total_processed, 2);
    assert_eq!(stats.new_items, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(processor.store().count().await.unwrap(), 1);
}

#[tokio::test]
async fn upsert_by_link_replaces_the_whole_row() {
    let store = ListingStore::in_memory().await.unwrap();
    let link = "https://www.avito.ru/ufa/kvartiry/flat-1";

    let mut first = listing(link, "Старый заголовок");
    first.deposit = "Залог 10000 ₽".to_string();
    store.upsert(&first).await.unwrap();

    // Same link, different fields, no deposit this time.
    let second = listing(link, "Новый заголовок");
    store.upsert(&second).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);

    let rows = store.page(0, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Новый заголовок");
    assert_eq!(rows[0].deposit, "");
}

#[tokio::test]
async fn count_tracks_distinct_links() {
    let store = ListingStore::in_memory().await.unwrap();
    for i in 0..4 {
        let item = listing(
            &format!("https://www.avito.ru/ufa/kvartiry/flat-{i}"),
            &format!("Квартира {i}"),
        );
        store.upsert(&item).await.unwrap();
    }
    assert_eq!(store.count().await.unwrap(), 4);
}

#[tokio::test]
async fn recent_is_capped_and_newest_first() {
    let store = ListingStore::in_memory().await.unwrap();
    for i in 0..5 {
        let mut item = listing(
            &format!("https://www.avito.ru/ufa/kvartiry/flat-{i}"),
            &format!("Квартира {i}"),
        );
        item.images = vec![format!("https://10.img.avito.st/{i}.jpg")];
        store.upsert(&item).await.unwrap();
    }

    let recent = store.recent(3).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].title, "Квартира 4");
    assert_eq!(recent[1].title, "Квартира 3");
    assert_eq!(recent[2].title, "Квартира 2");
    assert_eq!(recent[0].image_count, 1);
}

#[tokio::test]
async fn page_windows_walk_the_table_newest_first() {
    let store = ListingStore::in_memory().await.unwrap();
    for i in 0..5 {
        let item = listing(
            &format!("https://www.avito.ru/ufa/kvartiry/flat-{i}"),
            &format!("Квартира {i}"),
        );
        store.upsert(&item).await.unwrap();
    }

    let first = store.page(0, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].title, "Квартира 4");
    assert_eq!(first[1].title, "Квартира 3");

    let second = store.page(2, 2).await.unwrap();
    assert_eq!(second[0].title, "Квартира 2");
    assert_eq!(second[1].title, "Квартира 1");

    let last = store.page(4, 2).await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].title, "Квартира 0");
}

#[tokio::test]
async fn by_id_returns_the_full_row_or_nothing() {
    let store = ListingStore::in_memory().await.unwrap();
    let mut item = listing("https://www.avito.ru/ufa/kvartiry/flat-1", "Квартира");
    item.images = vec![
        "https://10.img.avito.st/1.jpg".to_string(),
        "https://10.img.avito.st/2.jpg".to_string(),
    ];
    store.upsert(&item).await.unwrap();

    let id = store.page(0, 1).await.unwrap()[0].id;
    let found = store.by_id(id).await.unwrap().expect("row should exist");
    assert_eq!(found.title, "Квартира");
    assert_eq!(found.images.len(), 2);
    assert!(found.scraped_at.is_some());

    assert!(store.by_id(id + 1000).await.unwrap().is_none());
}

#[tokio::test]
async fn extracted_fields_survive_the_round_trip() {
    let processor = processor().await;
    let html = page(1);

    processor.process_html(&html, "test").await;

    let rows = processor.store().page(0, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.title, "1-к. квартира, 40 м²");
    assert_eq!(row.price, "21 000 ₽ в месяц");
    assert_eq!(row.deposit, "Залог 15000 ₽");
    assert_eq!(row.commission, "Комиссия 50%");
    assert_eq!(row.utilities, "ЖКУ включены");
    assert_eq!(row.address, "ул. Ленина, 1");
    assert_eq!(row.link, "https://www.avito.ru/ufa/kvartiry/flat-1");
    assert_eq!(row.images, vec!["https://10.img.avito.st/1.jpg"]);
}
