pub mod batch;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod inventory;
pub mod lookup;
pub mod persist;
pub mod types;
