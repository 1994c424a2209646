//! Request and response bodies

pub mod clients;
pub mod billing;
