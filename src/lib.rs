pub mod core;
mod dev_tools;
pub mod distributions;
pub mod euclidean;
pub mod friction;
pub mod integrator;
pub mod rahmc;
pub mod stats;
