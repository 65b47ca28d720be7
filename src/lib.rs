//! Device parts: gesture toggles, sysfs nodes and the doze service.
//!
//! The interesting piece is [`dependency`], which decides when a gated toggle
//! is forced off and restores the user's choice afterwards. [`session`] applies
//! those decisions to toggles and the preference store; everything else is
//! plumbing around sysfs, `am` and `settings`.

pub mod broadcast;
pub mod config;
pub mod dependency;
pub mod error;
pub mod gestures;
pub mod logging;
pub mod nodes;
pub mod parts_config;
pub mod prefs;
pub mod prefs_watch;
pub mod secure;
pub mod services;
pub mod session;
pub mod shell;
pub mod state;
pub mod sysfs;
