//! Error‑State layout shared between the preintegrator and the filter core.
//!
//! The filter core owns the state itself; this module only fixes how its
//! 15-dimensional error and the 18-dimensional step noise are laid out, so
//! that every matrix block can be addressed by the sub-state it belongs to.

mod covariance;
pub mod state;
pub use covariance::{Covariance, StateMatrix, Transition};
pub use state::{ErrorState, NoiseState};

/// Maps the step noise onto the error state.
pub type NoiseJacobian<T> = StateMatrix<ErrorState<T>, NoiseState<T>>;
