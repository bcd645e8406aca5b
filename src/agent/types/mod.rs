mod common;
pub mod rag;
pub mod responses;

pub use common::*;
