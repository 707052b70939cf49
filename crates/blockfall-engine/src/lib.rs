pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("tick scheduler is stopped")]
pub struct SchedulerStoppedError;
