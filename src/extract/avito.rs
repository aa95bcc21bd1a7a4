use anyhow::{anyhow, Result};
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::extract::text::{absolutize, collapse_ws, truncate_description, TextPatterns};
use crate::models::Listing;

const MAX_IMAGES: usize = 3;

/// Common trait for page extractors.
/// This allows easy addition of new sources (Cian, Yandex Realty, etc) in
/// the future.
pub trait SiteExtractor {
    /// Turn a rendered page into zero or more listings. Never fails: a
    /// card that cannot be parsed is dropped, not surfaced.
    fn extract(&self, html: &str) -> Vec<Listing>;

    /// Get the name of the extractor source
    fn site_name(&self) -> &'static str;
}

/// Extractor for Avito search-results markup.
///
/// Avito ships several generations of markup for the same page, so every
/// lookup runs an ordered list of selector fallbacks: the first one that
/// matches wins. All selectors and text patterns are compiled once, here.
pub struct AvitoExtractor {
    card_selectors: Vec<Selector>,
    title_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    address_selectors: Vec<Selector>,
    street_anchors: Selector,
    description_selectors: Vec<Selector>,
    carousel_selectors: Vec<Selector>,
    any_img: Selector,
    host_imgs: Selector,
    link_selectors: Vec<Selector>,
    patterns: TextPatterns,
}

impl AvitoExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            card_selectors: selectors(&[
                r#"[data-marker="item"]"#,
                ".iva-item-root",
                ".items-items-kAJAg .iva-item-root",
                ".item-item",
                ".js-catalog-item",
            ])?,
            title_selectors: selectors(&[
                r#"[data-marker="item-title"]"#,
                ".iva-item-titleStep",
                ".title-root",
                "h3 a",
                ".iva-item-title",
            ])?,
            price_selectors: selectors(&[
                r#"[data-marker="item-price"]"#,
                ".price-price",
                ".iva-item-priceStep",
                ".js-item-price",
            ])?,
            address_selectors: selectors(&[
                r#"[data-marker="item-address"]"#,
                ".iva-item-address",
                ".geo-address",
                ".item-address",
            ])?,
            street_anchors: selector(r#"a[href*="/catalog/houses/"], a[href*="/kvartiry/"]"#)?,
            description_selectors: selectors(&[
                r#"[data-marker="item-specific-params"]"#,
                ".iva-item-description",
                ".item-description",
                ".description-text",
            ])?,
            carousel_selectors: selectors(&[
                ".photo-slider-list-item-r2YDC",
                r#"[data-marker*="slider-image"]"#,
                ".photo-slider-item-mbNB3",
            ])?,
            any_img: selector("img")?,
            host_imgs: selector(r#"img[src*="avito.st"]"#)?,
            link_selectors: selectors(&[
                r#"a[data-marker="item-title"]"#,
                "a.iva-item-title",
                "a.link-link",
                r#"a[href*="/kvartiry/"]"#,
            ])?,
            patterns: TextPatterns::new()?,
        })
    }

    /// Extract every listing card from one page of markup.
    pub fn extract(&self, html: &str) -> Vec<Listing> {
        let doc = Html::parse_document(html);
        let mut listings = Vec::new();

        let Some(cards) = self.find_cards(&doc) else {
            warn!("no listing cards matched any known selector");
            return listings;
        };

        for card in cards {
            match self.extract_card(card) {
                Ok(listing) => {
                    if listing.title.is_empty() {
                        debug!("dropping card without a title");
                        continue;
                    }
                    listings.push(listing);
                }
                Err(e) => warn!("skipping unparsable card: {e:#}"),
            }
        }

        listings
    }

    /// Try each card selector in order; the first one with matches is used
    /// for the whole page. Mixing selectors within one page is deliberately
    /// unsupported.
    fn find_cards<'a>(&self, doc: &'a Html) -> Option<Vec<ElementRef<'a>>> {
        for sel in &self.card_selectors {
            let cards: Vec<_> = doc.select(sel).collect();
            if !cards.is_empty() {
                debug!(count = cards.len(), "listing cards located");
                return Some(cards);
            }
        }
        None
    }

    fn extract_card(&self, card: ElementRef<'_>) -> Result<Listing> {
        // Running text of the whole card, scanned by the regex patterns.
        let card_text: String = card.text().collect();

        Ok(Listing {
            title: self.card_title(card),
            price: self.card_price(card),
            deposit: self.patterns.deposit(&card_text),
            commission: self.patterns.commission(&card_text),
            utilities: self.patterns.utilities(&card_text),
            address: self.card_address(card),
            description: self.card_description(card),
            images: self.card_images(card),
            link: self.card_link(card),
            scraped_at: Utc::now(),
        })
    }

    fn card_title(&self, card: ElementRef<'_>) -> String {
        for sel in &self.title_selectors {
            if let Some(el) = card.select(sel).next() {
                let title = stripped_text(el);
                if !title.is_empty() {
                    return title;
                }
            }
        }
        String::new()
    }

    /// A price is only trusted when it is currency-qualified; "Цена по
    /// запросу" and similar placeholders are treated as no match.
    fn card_price(&self, card: ElementRef<'_>) -> String {
        for sel in &self.price_selectors {
            if let Some(el) = card.select(sel).next() {
                let price = collapse_ws(&stripped_text(el));
                if price.contains('₽') || price.to_lowercase().contains("руб") {
                    return price;
                }
            }
        }
        String::new()
    }

    /// Street and house-number anchors are preferred over the block's full
    /// text, which also carries metro and distance noise.
    fn card_address(&self, card: ElementRef<'_>) -> String {
        for sel in &self.address_selectors {
            if let Some(block) = card.select(sel).next() {
                let parts: Vec<String> = block
                    .select(&self.street_anchors)
                    .take(2)
                    .map(stripped_text)
                    .filter(|part| !part.is_empty())
                    .collect();
                if !parts.is_empty() {
                    return collapse_ws(&parts.join(", "));
                }

                // Fallback: keep up to the second comma-separated segment.
                let full: String = block.text().collect();
                let head = full.split(',').take(2).collect::<Vec<_>>().join(",");
                let head = head.trim();
                if !head.is_empty() {
                    return collapse_ws(head);
                }
            }
        }
        String::new()
    }

    fn card_description(&self, card: ElementRef<'_>) -> String {
        for sel in &self.description_selectors {
            if let Some(el) = card.select(sel).next() {
                let desc = stripped_text(el);
                if !desc.is_empty() {
                    return truncate_description(&desc);
                }
            }
        }
        String::new()
    }

    /// Collect up to [`MAX_IMAGES`] absolute image URLs from the photo
    /// carousel, falling back to any avito.st-hosted image on the card.
    fn card_images(&self, card: ElementRef<'_>) -> Vec<String> {
        let mut images = Vec::new();

        for sel in &self.carousel_selectors {
            for item in card.select(sel) {
                if images.len() >= MAX_IMAGES {
                    break;
                }

                if let Some(img) = item.select(&self.any_img).next() {
                    let src = img
                        .value()
                        .attr("src")
                        .or_else(|| img.value().attr("data-src"));
                    if let Some(src) = src {
                        push_image(&mut images, src);
                    }
                } else if let Some(marker) = item.value().attr("data-marker") {
                    // Some generations encode the URL straight into the
                    // data-marker attribute.
                    if let Some(src) = marker.strip_prefix("slider-image/image-") {
                        push_image(&mut images, src);
                    }
                }
            }
        }

        if images.is_empty() {
            for img in card.select(&self.host_imgs) {
                if images.len() >= MAX_IMAGES {
                    break;
                }
                if let Some(src) = img.value().attr("src") {
                    push_image(&mut images, src);
                }
            }
        }

        images
    }

    fn card_link(&self, card: ElementRef<'_>) -> String {
        for sel in &self.link_selectors {
            if let Some(anchor) = card.select(sel).next() {
                if let Some(href) = anchor.value().attr("href") {
                    if let Some(link) = absolutize(href) {
                        return link;
                    }
                }
            }
        }
        String::new()
    }
}

impl SiteExtractor for AvitoExtractor {
    fn extract(&self, html: &str) -> Vec<Listing> {
        AvitoExtractor::extract(self, html)
    }

    fn site_name(&self) -> &'static str {
        "Avito"
    }
}

fn push_image(images: &mut Vec<String>, src: &str) {
    if let Some(url) = absolutize(src) {
        if !images.contains(&url) {
            images.push(url);
        }
    }
}

/// Text content of an element with each text node trimmed, matching the
/// way the card markup nests inline tags.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .concat()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e}"))
}

fn selectors(css: &[&str]) -> Result<Vec<Selector>> {
    css.iter().map(|s| selector(s)).collect()
}
