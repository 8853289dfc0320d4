//! Authentication module for gestor.
//!
//! This module provides password hashing and credential checks for users.

mod password;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
