//! Token secrets and the records/items built from them.

pub mod record;
pub mod secret;
