//! Error handling for the xrandr_split shim

use x11::xlib::XID;

/// Shim error types
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("fake entity arena is full ({capacity} entries)")]
    CapacityExceeded { capacity: usize },

    #[error("identifier {xid:#x} already carries the split tag {tag:#x}")]
    TagCollision { xid: XID, tag: XID },

    #[error("cannot load {path}: {reason}")]
    LibraryLoad { path: String, reason: String },

    #[error("symbol {name} not found in the real Xrandr library")]
    MissingSymbol { name: &'static str },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Parse error: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, SplitError>;

impl SplitError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn library_load<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::LibraryLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
