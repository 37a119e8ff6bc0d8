//! Progress throttling.
//!
//! Rate-limits `ProgressUpdated` relays so chatty transports do not flood
//! observers.

mod throttle;

pub use throttle::ProgressThrottle;
