//! Credential and principal models shared by the session store and the coordinator.

pub mod token;
pub mod user;

pub use token::*;
pub use user::*;
