mod utils;

#[cfg(test)]
mod test_utils;

pub mod abstractions;
pub mod aggregator;
pub mod background_worker;
pub mod commands;
pub mod constants;
pub mod encounter_state;
pub mod entity_registry;
pub mod event_handler;
pub mod flags;
pub mod interval_timer;
pub mod logger;
pub mod models;
pub mod publisher;
pub mod segmenter;
pub mod skill_names;
pub mod start;
pub mod store;

pub use start::StartOptions;
pub use start::start;
