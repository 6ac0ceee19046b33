pub mod health;
pub mod http;
pub mod persistence;
pub mod render;
