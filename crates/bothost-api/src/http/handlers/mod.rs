pub mod admin;
pub mod bot;
pub mod status;
