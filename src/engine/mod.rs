//! Core engine: the polling loop and the process lifecycle around it.

pub mod autorenew;
pub mod clock;
pub mod interrupt;
pub mod lifecycle;
pub mod orchestrator;
