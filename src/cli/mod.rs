pub mod cli;

pub use cli::{AutostartAction, Command, CommandArgs, RunArgs};
