pub mod chase;
pub mod player;
pub mod source;
