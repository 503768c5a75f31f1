pub mod manager;
pub mod record;
