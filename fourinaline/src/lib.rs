pub use board::*;
pub use errors::*;
pub use game_server::*;
pub use mark::*;
pub use player::*;
pub use protocol::*;
pub use ticket::*;
pub use visualization::*;

#[cfg(test)]
mod arbitrary;
mod board;
mod errors;
mod game_server;
mod mark;
mod player;
mod protocol;
mod ticket;
mod visualization;
