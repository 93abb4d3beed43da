pub mod command;
pub mod gotify;

pub use command::CommandNotifier;
pub use gotify::{GotifyConfig, GotifyNotifier};
