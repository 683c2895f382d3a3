//! Task splitting and worker dispatch.
//!
//! - **split**: even partition of a task range across the worker list
//! - **dispatch**: one tmux window per worker running the benchmark driver
//! - **session**: multiplexer backends (real tmux, recording for dry runs)
//!
//! # Architecture
//!
//! ```text
//!            [start, end)
//!                 │
//!          ┌──────▼───────┐
//!          │ split_range  │
//!          └──────┬───────┘
//!                 │ Plan
//!          ┌──────▼───────┐
//!          │  Dispatcher  │──── SessionBackend (tmux)
//!          └──────┬───────┘
//!                 │
//!     ┌───────────┼───────────┐
//!     ▼           ▼           ▼
//! ┌────────┐ ┌────────┐  ┌────────┐
//! │worker1 │ │worker2 │  │workerN │   gbox_run.py --start .. --end ..
//! └────────┘ └────────┘  └────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use webarena_fleet::config::FleetConfig;
//! use webarena_fleet::scheduler::{split_range, Dispatcher, TaskRange, TmuxBackend};
//!
//! let config = FleetConfig::load(None)?;
//! let plan = split_range(TaskRange::new(0, 812)?, &config.workers)?;
//! let dispatcher = Dispatcher::new(config, TmuxBackend::default());
//! dispatcher.dispatch(&plan, "results_full".as_ref(), false).await?;
//! ```

pub mod dispatch;
pub mod session;
pub mod split;

pub use dispatch::{shell_join, shell_quote, DispatchReport, Dispatcher, LaunchedWorker};
pub use session::{RecordingBackend, SessionBackend, TmuxBackend};
pub use split::{split_range, Assignment, Plan, TaskRange};
