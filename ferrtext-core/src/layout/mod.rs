pub mod column;
pub mod compose;
pub mod config;
pub mod line;
pub mod page;
pub mod word;
