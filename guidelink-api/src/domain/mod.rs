//! Business rules that need no database: status parsing, participant and
//! audience checks, the chat availability window, the report state machine
//! and usage arithmetic. Services load rows, ask these functions, then write.

pub mod access;
pub mod address;
pub mod chat_window;
pub mod report_workflow;
pub mod status;
pub mod usage;

pub use chat_window::{ChatWindow, ClosedReason};
pub use report_workflow::ReportAction;
