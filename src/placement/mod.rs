pub mod sampler;
pub mod solver;
