pub mod fees;
pub mod health;
pub mod metrics;
pub mod network;
pub mod train;

pub use fees::*;
pub use health::*;
pub use metrics::*;
pub use network::*;
pub use train::*;
