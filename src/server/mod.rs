//! Listening socket and the serial accept loop

pub mod listener;

pub use listener::{Server, bind};
