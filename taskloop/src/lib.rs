//! Durable, auditable orchestration of agentic tasks.
//!
//! A task is a bounded unit of work driven through a plan → execute → analyze →
//! replan cycle. Every stage of the cycle writes its own log file and one line
//! in a master index, so any run can be reconstructed after the fact from the
//! task directory alone. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (step/plan types, result analysis,
//!   environment policy). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (task directories, the audit log,
//!   process execution, config). Isolated to enable mocking in tests.
//!
//! The orchestration loop ([`orchestrator`]) coordinates core logic with I/O;
//! the planner ([`planner`]), step executor ([`executor`]) and completion
//! provider ([`provider`]) are trait seams so backends stay pluggable.

pub mod chat;
pub mod core;
pub mod error;
pub mod executor;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod planner;
pub mod provider;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
