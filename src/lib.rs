//! Continuous-time Bayesian networks: conditional intensity matrices, exact and sampling
//! inference, parameter estimation and structure learning from trajectories.

pub mod util;
pub mod config;
pub mod variable;
pub mod factor;
pub mod cim;
pub mod graph;
pub mod init;
pub mod model;
pub mod generator;
pub mod trajectory;
pub mod samplers;
pub mod inference;
pub mod estimators;
pub mod learning;

pub use util::{CtbnError, Result};
pub use cim::Cim;
pub use factor::Factor;
pub use model::{Ctbn, CtbnBuilder};
pub use trajectory::{Event, Trajectory};
pub use variable::{DiscreteVariable, Instantiation};
