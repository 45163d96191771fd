// Aggregates signal detection, challenge solving, and auto-solve orchestration layers.

pub mod core;
pub mod detectors;
pub mod pipeline;
pub mod solvers;
