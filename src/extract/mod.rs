pub mod avito;
pub mod text;

pub use avito::{AvitoExtractor, SiteExtractor};
