//! Domain models for the weather forecast platform

mod calendar;
mod condition;
mod forecast;
mod observation;
mod prediction;

pub use calendar::*;
pub use condition::*;
pub use forecast::*;
pub use observation::*;
pub use prediction::*;
