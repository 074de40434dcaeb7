pub mod browser;
pub mod http;
pub mod session;
pub mod sink;
pub mod traits;
pub mod types;

pub use browser::{ChromeOptions, ChromeRenderer};
pub use http::HttpRenderer;
pub use session::{
    MultiPageAggregator, SessionConfig, SessionMetadata, SessionOutcome, SessionState,
};
pub use sink::{JsonFileSink, SessionReport};
pub use traits::{PageRenderer, ResultSink};
pub use types::{RenderRequest, SearchParameters, WaitCondition};
