//! Adapters implementing the application ports.

mod clock;
mod reqwest_transport;

pub use clock::{ManualClock, SystemClock};
pub use reqwest_transport::{ReqwestTransport, MAX_REDIRECTS};
