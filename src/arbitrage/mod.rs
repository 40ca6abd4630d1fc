pub mod catalog;
pub mod detector;
