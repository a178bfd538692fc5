#![forbid(unsafe_code)]

//! Core primitives for settle forms.
//!
//! - [`clock`]: monotonic time sources, including a manual clock for tests.
//! - [`debounce`]: the [`Debouncer`] that turns keystroke bursts into stable
//!   values.
//! - [`logging`]: a line-oriented tracing layer and subscriber setup.

pub mod clock;
pub mod debounce;
pub mod logging;

pub use clock::{Clock, Instant, ManualClock, SystemClock};
pub use debounce::{DebounceStats, Debouncer, earliest_deadline};
