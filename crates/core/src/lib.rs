#![forbid(unsafe_code)]

pub mod model;
pub mod selection;
pub mod theory;
pub mod time;

pub use time::Clock;
