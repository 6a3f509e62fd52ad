pub mod board;
pub mod periodic;
pub mod pump;
pub mod service;
