pub mod dataset;
pub mod date_range;
pub mod point;
pub mod statistics;
