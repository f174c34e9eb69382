//! Compute passes: the Game of Life transition and the activation override

pub mod activation_stage;
pub mod simulation_stage;

pub use activation_stage::{ActivationParams, ActivationStage};
pub use simulation_stage::SimulationStage;
