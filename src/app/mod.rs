pub mod api;
pub mod curriculum_store;
pub mod model;
