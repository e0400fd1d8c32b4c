//! Built-in job implementations

mod command;

pub use command::CommandJob;
