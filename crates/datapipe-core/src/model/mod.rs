pub mod data_point;
pub mod shape;

pub use data_point::{DataPoint, DataPointAction, Record};
pub use shape::{PropertyType, Shape};
