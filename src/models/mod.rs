pub mod forum;

pub use forum::*;
