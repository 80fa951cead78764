pub mod filter;
pub mod region;
pub mod session;
