pub mod error;
pub mod extract;
pub mod geom;
pub mod model;
pub mod names;
pub mod report;
pub mod store;
