pub mod alias;
pub mod executor;

pub use alias::{AliasEntry, AliasResolver};
pub use executor::{ExecutionResult, Executor};
