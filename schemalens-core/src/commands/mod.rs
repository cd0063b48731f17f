//! Command implementations: diff, ddl, migration, merge, apply, status,
//! replay.

pub mod apply;
pub mod ddl;
pub mod diff;
pub mod merge;
pub mod migration;
pub mod replay;
pub mod status;
