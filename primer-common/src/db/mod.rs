//! Database bootstrap shared by every primer binary

pub mod init;

pub use init::*;
