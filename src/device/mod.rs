pub mod clock;
pub mod context;
pub mod node;
pub mod state;

pub use clock::Clock;
pub use context::{Device, Identity, LinkConfig, OperationalState};
pub use node::Node;
pub use state::WindowOutcome;
