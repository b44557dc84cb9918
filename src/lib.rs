pub mod clienv;
pub mod control;
pub mod error;
pub mod http_server;
pub mod settings;

pub use control::ControlService;
pub use error::{ControlError, ErrorKind, Result};
pub use settings::{ControlConfig, ControlSettings};
