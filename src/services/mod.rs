pub mod dataset;
pub mod ethereum;
pub mod fetcher;
pub mod solver;
pub mod store;
pub mod training;

pub use dataset::blocks_to_dataset;
pub use ethereum::{default_rate_limit_classifier, BlockSource, EthereumSource, RateLimitClassifier};
pub use fetcher::{FetchPolicy, RangeFetcher};
pub use solver::{fit_linear_regression, predict};
pub use store::ModelStore;
pub use training::TrainingService;
