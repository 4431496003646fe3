pub mod detector;
pub mod resolver;
pub mod similarity;
