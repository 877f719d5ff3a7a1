mod driver;
mod engine;

pub use driver::{DriverSlot, TickDriver};
pub use engine::{AutoStop, PhaseScheduler, PhaseTransition, SchedulerSnapshot, SchedulerState};
