//! Pieces shared by the `camfeed-capture` and `camfeed-relay` services.

pub mod config;
pub mod frame;
pub mod mjpeg;
pub mod shutdown;
pub mod status;
pub mod viewers;
