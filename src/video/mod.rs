pub mod events;
pub mod generator;
pub mod movie;
pub mod player;
