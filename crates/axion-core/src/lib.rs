//! Axion Core - Device registry, build metadata and reply composition
//!
//! This crate holds everything the bot does that is not I/O:
//! - Registry parsing (structured JSON and flat text) into one snapshot type
//! - Build manifest normalization (size and date rendering)
//! - The freshness cache shared by the remote loaders
//! - Command and control-token classification
//! - Reply composition (message text plus inline controls)

pub mod builds;
pub mod cache;
pub mod command;
pub mod compose;
pub mod format;
pub mod registry;

pub use builds::{parse_latest_build, BuildError, BuildKey, BuildRecord, Variant};
pub use cache::{FreshnessCache, DEFAULT_MAX_BUILD_ENTRIES, DEFAULT_TTL};
pub use command::{CallbackAction, Command};
pub use compose::{Button, ButtonAction, DeviceView, Flow, Keyboard, ParseMode, Reply};
pub use format::split_message;
pub use registry::{Registry, RegistryError, RegistryPayload};
