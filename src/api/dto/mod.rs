pub mod connect;
pub mod plugin;
pub mod site;
pub mod theme;
