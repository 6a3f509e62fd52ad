pub mod policy;
pub mod protocol;
pub mod session;
pub mod transport;
