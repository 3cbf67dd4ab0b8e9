// Application layer - Use case interactors

pub mod capture_interactor;
pub mod container;
pub mod resolve_interactor;
pub mod simulate_interactor;
pub mod trim_interactor;

// Re-export interactors
pub use capture_interactor::{Recorder, RecorderState};
pub use resolve_interactor::ResolveInteractor;
pub use simulate_interactor::SimulateInteractor;
pub use trim_interactor::{SessionSettings, SessionState, TrimSession, TrimSessionPorts};
