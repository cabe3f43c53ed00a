//! Type definitions shared by the fujinet crates

pub mod error;
pub mod flags;
pub mod method;
pub mod session_info;
pub mod time;

pub use error::{Error, Result};
pub use flags::{InfoFlags, OpenFlags, OpenResponseFlags, ReadFlags};
pub use method::Method;
pub use session_info::{ReadOutcome, SessionInfo};
pub use time::{ClockTime, FormattedTime, TimeFormat};
