//! Local file-system storage.
//!
//! - `scratch` names the per-host working files a session downloads into and
//!   uploads from.
//! - `settings` reads and writes the agent's own TOML settings file.

pub mod scratch;
pub mod settings;
