pub mod formats;

use flexi_logger::{Logger, LoggerHandle};

use crate::Error;

/// Log to stderr so stdout only carries command output. Level comes from
/// `RUST_LOG`, default `info`.
pub fn init() -> Result<LoggerHandle, Error> {
    let handle = Logger::try_with_env_or_str("info")?
        .format(formats::cli_format)
        .log_to_stderr()
        .start()?;

    Ok(handle)
}
