pub mod connection_state;
pub mod direction;
