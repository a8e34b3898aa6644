pub mod inspect;
pub mod model;

// Re-export commonly used types/functions for consumers
pub use inspect::{inspect_lpc, inspect_ports, plan};
pub use model::{LpcInspection, Plan, PortsInspection};
