//! Motor control: command encoding and the turn-then-drive controller
pub mod commands;
pub mod controllers;

pub use commands::MotorCommand;
pub use controllers::DriveController;
