pub mod caller;
pub mod query;
