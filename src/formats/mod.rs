pub mod commands;
pub mod litematic;
pub mod manager;
pub mod structure;
