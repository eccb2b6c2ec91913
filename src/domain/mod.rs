pub mod auth;
pub mod filter;
pub mod form;
pub mod posture;
