//! Query functions, one module per table.
//!
//! All functions take a borrowed [`rusqlite::Connection`]; the caller owns
//! the handle and serializes access.

pub mod channels;
pub mod identity;
pub mod join_requests;
pub mod messages;
pub mod peers;
pub mod vouches;
