//! Cooperative cancellation for in-flight stage executions.

mod token;

pub use token::CancellationToken;
