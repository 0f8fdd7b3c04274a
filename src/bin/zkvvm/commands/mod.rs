//! Command implementations

pub mod compile;
pub mod completions;
pub mod install;
pub mod ls;
pub mod ls_remote;
pub mod uninstall;
