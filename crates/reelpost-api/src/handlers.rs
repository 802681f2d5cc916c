//! Request handlers.

pub mod health;
pub mod publish;
pub mod queue;

pub use health::*;
pub use publish::*;
pub use queue::*;
