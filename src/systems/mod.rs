pub mod collision;
pub mod hooks;
pub mod integrate;
