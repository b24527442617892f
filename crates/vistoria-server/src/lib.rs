//! Serves the application under test from a directory so scenarios have a
//! local target without an external web server. Readiness is the successful
//! bind; there is no fixed startup delay.

mod error;
mod server;

pub use error::{Error, Result};
pub use server::{StaticServer, StaticServerHandle};
