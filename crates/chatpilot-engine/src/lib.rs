pub mod backend;
pub mod channel;
pub mod client;
pub mod config;
pub mod interaction;
pub mod registry;
pub mod session;

pub use chatpilot_common::error;
pub use chatpilot_common::protocol;
pub use chatpilot_common::site;
