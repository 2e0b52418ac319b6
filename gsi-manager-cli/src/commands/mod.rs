pub mod apply;
pub mod plan;
pub mod poll;
pub mod start;
