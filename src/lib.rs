mod bus_types;
mod gauss;
mod newton;
mod order;
mod pfopt;
mod runpf;
mod sbus;
mod ybus;

pub mod cases;
pub mod dataset;
pub mod debug;
pub mod error;
pub mod io;
pub mod network;
pub mod residual;
pub mod sampler;
pub mod solver;
pub mod topology;

pub use error::*;
pub use newton::{LogProgress, ProgressMonitor};
pub use order::*;
pub use pfopt::*;
pub use runpf::*;
pub use sbus::*;
pub use ybus::*;
