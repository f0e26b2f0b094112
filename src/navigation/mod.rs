//! Navigation for the fleet
//!
//! [`planner`] decides what a robot does next given everyone's reservations,
//! [`coordinator`] carries that decision out over time.
pub mod coordinator;
pub mod planner;

pub use coordinator::Coordinator;
pub use planner::{Conflict, Leg, PlanDecision, Planner};
