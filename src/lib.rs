pub mod aggregate;
pub mod args;
pub mod dataset;
pub mod labels;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod store;
pub mod targets;
pub mod utils;

pub use args::Args;
pub use matcher::{CitationFlags, CitationTargets};
pub use normalize::{normalize, NormalizedUrl};
pub use pipeline::{combine, rates, CombineOptions, RatesOptions};
pub use stats::{OwnedCitationSummary, RateReport, UrlCitationRate};
