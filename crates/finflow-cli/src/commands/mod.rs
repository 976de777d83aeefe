pub mod backend;
pub mod config;
pub mod dev;
pub mod frontend;
pub mod rotate;
pub mod status;
pub mod switch;
pub mod totp;
