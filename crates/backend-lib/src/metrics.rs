// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const LOGIN_LOCKED_OUT: &str = "auth.login.locked_out";
pub const LOGOUT: &str = "auth.logout";
pub const SESSION_ACTIVE: &str = "auth.session.active";
pub const SESSION_EXPIRED: &str = "auth.session.expired";
pub const ACCESS_DENIED: &str = "auth.access.denied";
pub const ACCESS_REDIRECTED: &str = "auth.access.redirected";
