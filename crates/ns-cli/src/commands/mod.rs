//! CLI subcommand implementations.

pub mod adjust;
pub mod delete_night;
pub mod fix;
pub mod merge;
pub mod nights;
pub mod record;
pub mod split;
pub mod util;
