pub mod builder;
pub mod fields;
pub mod page;
pub mod pagination;
pub mod selectors;

pub use builder::{build_ad, BuildOutcome, ExtractorOptions, ParseContext, RawAdFields, BASE_URL};
pub use page::PageParser;
pub use pagination::{clamp_page_count, detect_page_count, MAX_PLAUSIBLE_PAGES};
pub use selectors::{CompiledSelectors, SelectorConfig, SelectorOverrides};
