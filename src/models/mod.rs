pub mod ai;
pub mod auth;
pub mod creator;
pub mod thumbnail_test;
pub mod viral;
pub mod youtube;
