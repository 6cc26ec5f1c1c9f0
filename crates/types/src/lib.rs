mod chain;
mod deployment;
mod framework;

pub use chain::*;
pub use deployment::*;
pub use framework::*;
