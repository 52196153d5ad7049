//! Query modules, one per table
//!
//! Plain functions over a `SqlitePool`; schema creation lives in
//! `lprs_common::db`.

pub mod archives;
pub mod compare;
pub mod events;
pub mod images;
