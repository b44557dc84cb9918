pub(crate) mod config;
pub(crate) mod daemon;
pub(crate) mod serve;

use serde::Serialize;

/// Pretty JSON on stdout, so output can be piped into `jq`.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
