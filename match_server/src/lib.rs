mod config;
mod coordinator;
mod registry;
mod service;
mod turn_gate;
mod watchdog;
pub use config::*;
pub use coordinator::*;
pub use registry::*;
pub use service::*;
pub use turn_gate::*;
