pub mod helper;
pub mod plugin;
