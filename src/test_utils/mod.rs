pub mod misc;
pub mod templates;
pub mod event_builder;
pub mod event_handler_builder;
pub mod state_builder;

pub use misc::*;
pub use templates::*;
pub use event_builder::*;
pub use event_handler_builder::*;
pub use state_builder::*;
