//! In-memory session tracking
//!
//! Sessions correlate successive requests from one client through a cookie.
//! They live for the lifetime of the process and are never evicted.

pub mod store;

pub use store::{
    SESSION_ID_LENGTH, Session, SessionBinding, SessionError, SessionStore, generate_session_id,
    set_cookie_value,
};
