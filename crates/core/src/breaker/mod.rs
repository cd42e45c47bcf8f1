mod error;
mod settings;
mod state;
mod traits;

pub use error::{BreakerError, Result};
pub use settings::{BreakerSettings, StateChangeHook};
pub use state::{Admission, BreakerMachine, CircuitState, Counts, Rejection, Transition};
pub use traits::Breaker;
