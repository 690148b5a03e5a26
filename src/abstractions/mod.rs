pub mod event_emitter;
pub mod event_source;
pub mod file_system;
pub mod persister;
pub mod settings_manager;

pub use event_emitter::*;
pub use event_source::*;
pub use file_system::*;
pub use persister::*;
pub use settings_manager::*;
