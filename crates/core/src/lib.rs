pub mod sim;
pub mod state;
pub mod types;

pub use sim::Sim;
pub use state::{Companion, Grid, Owner, SimState};
pub use types::*;
