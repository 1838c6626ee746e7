//! Value Object Module

pub mod email;
pub mod full_name;
pub mod password;
pub mod role;
pub mod username;
