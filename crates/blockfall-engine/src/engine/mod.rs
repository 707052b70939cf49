//! Game state machine and the machinery driving it.
//!
//! - [`PlayfieldState`] - Locked cells plus the active piece, with all mutation rules
//! - [`Notifier`] / [`FieldObserver`] - Synchronous change notifications
//! - [`SharedPlayfield`] - The single lock guarding a playfield across threads
//! - [`TickScheduler`] - Gravity worker thread and player command queue
//! - [`SessionSnapshot`] - Serializable session state for pause and resume
//! - [`ScoreCounter`] / [`ScoreSink`] - Line-count scoring and final score output
//! - [`GameSession`] - One game wiring all of the above together
//!
//! # Example
//!
//! ```
//! use blockfall_engine::{FieldSize, LockOutcome, NextPiece, PieceKind, PlayfieldState};
//!
//! let mut state = PlayfieldState::new(FieldSize::default(), NextPiece::new(PieceKind::T, 0));
//!
//! state.move_horizontal(-3);
//! state.rotate(1);
//! while state.move_vertical(1) {}
//!
//! let outcome = state.lock_and_advance(NextPiece::new(PieceKind::I, 0));
//! assert_eq!(outcome, LockOutcome::Continued { cleared_rows: vec![] });
//! ```

pub use self::{
    events::*, randomizer::*, scheduler::*, score::*, session::*, shared::*, snapshot::*,
    state::*,
};

mod events;
mod randomizer;
mod scheduler;
mod score;
mod session;
mod shared;
mod snapshot;
mod state;
