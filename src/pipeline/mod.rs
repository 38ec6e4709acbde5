pub mod compile;
pub mod naming;
pub mod persistence;
pub mod session;
pub mod store;
