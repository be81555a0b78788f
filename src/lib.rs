pub mod cli;
pub mod config;
pub mod dates;
pub mod document;
pub mod form;
pub mod guard;
pub mod render;
pub mod store;
pub mod submit;
pub mod theme;
pub mod util;
