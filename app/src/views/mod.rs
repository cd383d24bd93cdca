mod coin_table;
mod performance_tracker;

pub use coin_table::CoinTable;
pub use performance_tracker::PerformanceTracker;
