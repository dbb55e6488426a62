pub mod worker;
pub mod batch;

pub use worker::*;
pub use batch::*;
