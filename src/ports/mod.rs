pub mod command_runner;

pub use command_runner::{
    CommandError, CommandOutput, CommandRunner, DEFAULT_COMMAND_TIMEOUT, MAX_CAPTURED_OUTPUT,
};
