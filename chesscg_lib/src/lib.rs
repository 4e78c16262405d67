pub mod board;
pub mod controller;
pub mod error;
pub mod input;
pub mod loadout;
pub mod messages;
pub mod panel;
pub mod promotion;
pub mod render;
