// Session orchestration: state machine, background runner, in-memory store, HTTP surface.

pub mod handlers;
pub mod runner;
pub mod state_machine;
pub mod store;
pub mod uploads;
