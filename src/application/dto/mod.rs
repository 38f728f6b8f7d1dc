//! Login requests and where their tokens come from.

mod auth_dto;

pub use auth_dto::{LoginRequest, LoginResponse, TokenSource};
