pub mod connect;
pub mod health;
pub mod plugin;
pub mod site;
pub mod theme;
