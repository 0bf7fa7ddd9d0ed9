//! Dashboard state machine: model, pure update and view functions, timers,
//! listener bookkeeping and the runtime that executes commands.

pub mod model;
pub mod runtime;
pub mod scheduler;
pub mod subscription;
pub mod update;
pub mod view;
