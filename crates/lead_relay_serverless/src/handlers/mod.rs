pub mod edge;
pub mod gateway;
