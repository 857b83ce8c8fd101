mod log;
mod observer;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observer::Observer;
