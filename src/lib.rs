pub mod classifiers;
pub mod config;
pub mod core;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod manager;
pub mod preprocessing;
pub mod serving;
pub mod training;
pub mod ui;
pub mod utils;
pub mod versioning;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
