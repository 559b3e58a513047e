pub mod events;
pub mod health;
pub mod stations;
pub mod ws;
