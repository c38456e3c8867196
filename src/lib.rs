pub mod api;
pub mod error;
pub mod scene;
pub mod script;
