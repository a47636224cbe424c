// xrandr_split: show one ultra-wide RandR output as two side-by-side monitors.
//
// Build, then preload into any RandR client:
//   LD_PRELOAD=target/release/libxrandr_split.so xrandr --query
//
// The split is an illusion local to the preloaded process: the X server, and every
// process not running with the shim, still sees a single output.

pub mod arena;
pub mod classify;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod ffi;
pub mod id;
pub mod layer;
pub mod library;
pub mod logging;
pub mod provider;

pub use config::{SplitConfig, SplitSignature};
pub use error::{Result, SplitError};
pub use id::{IdSpace, Identifier};
pub use layer::SplitLayer;
pub use provider::RandrProvider;
