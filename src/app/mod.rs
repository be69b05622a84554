pub mod node;
pub mod simulation;
