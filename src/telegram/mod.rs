mod bot;
mod commands;
mod deploy;
mod logs;
mod streaming;
mod system;
#[cfg(test)]
mod testing;

pub use bot::App;
pub use commands::run_bot;
