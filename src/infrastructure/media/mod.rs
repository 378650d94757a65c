//! Media relay - live source to telephony-narrowband audio

pub mod relay;

pub use relay::{MediaRelay, RelayError, RelayHandle};
