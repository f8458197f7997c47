//! The caller-side collaborator layer: event plumbing, applied state, and
//! the controllers that connect the two to the core.

pub mod controller;
pub mod events;
pub mod proxy;
pub mod state;

pub use controller::{CopyController, ScanController};
pub use events::OrganizerEvent;
pub use proxy::EventProxy;
pub use state::OrganizerState;
