// Filter state, its URL codec and everything derived from it.

pub mod chips;
pub mod options;
pub mod picker;
pub mod query;
pub mod state;
pub mod store;
