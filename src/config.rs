//! Manager configuration and builder

use crate::codec::Endianness;
use crate::error::Result;
use crate::manager::ItemManager;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default allocation and growth step in bytes
pub const DEFAULT_CAPACITY: usize = 1024;

/// Settings fixed for the lifetime of an [`ItemManager`]
///
/// ```toml
/// endianness = "big"
/// initial_capacity = 4096
/// growth_increment = 0   # fixed capacity
/// strict = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Byte order of every multi-byte field
    pub endianness: Endianness,
    /// Bytes allocated up front
    pub initial_capacity: usize,
    /// Minimum growth step; 0 disables growth
    pub growth_increment: usize,
    /// Panic on reads through invalid or mismatched portals instead of returning `None`
    pub strict: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            endianness: Endianness::Little,
            initial_capacity: DEFAULT_CAPACITY,
            growth_increment: DEFAULT_CAPACITY,
            strict: false,
        }
    }
}

impl ManagerConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Fixed-capacity configuration: the buffer never grows past `capacity`
    pub fn fixed(capacity: usize) -> Self {
        ManagerConfig {
            initial_capacity: capacity,
            growth_increment: 0,
            ..Self::default()
        }
    }
}

/// Builder for customizing [`ItemManager`] creation
///
/// # Examples
///
/// ```rust
/// use brbon::{Endianness, ItemManagerBuilder, ItemType, ArrayValue};
///
/// # fn main() -> brbon::Result<()> {
/// let manager = ItemManagerBuilder::new()
///     .endianness(Endianness::Big)
///     .initial_capacity(256)
///     .root(ArrayValue::new(ItemType::UInt32))
///     .build()?;
/// assert_eq!(manager.count(&manager.root()), Some(0));
/// # Ok(())
/// # }
/// ```
pub struct ItemManagerBuilder {
    config: ManagerConfig,
    root: Value,
    root_name: Option<String>,
}

impl ItemManagerBuilder {
    /// Defaults plus an empty dictionary as the root
    pub fn new() -> Self {
        ItemManagerBuilder {
            config: ManagerConfig::default(),
            root: Value::Dictionary(Vec::new()),
            root_name: None,
        }
    }

    /// Start from an existing configuration
    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.config.endianness = endianness;
        self
    }

    pub fn initial_capacity(mut self, bytes: usize) -> Self {
        self.config.initial_capacity = bytes;
        self
    }

    /// Growth step in bytes, 0 for a fixed-capacity buffer
    pub fn growth_increment(mut self, bytes: usize) -> Self {
        self.config.growth_increment = bytes;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Value of the root item
    pub fn root<V: Into<Value>>(mut self, value: V) -> Self {
        self.root = value.into();
        self
    }

    /// Name of the root item
    pub fn root_name<S: Into<String>>(mut self, name: S) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Build the manager
    pub fn build(self) -> Result<ItemManager> {
        debug!(
            "Building item manager: {:?}, capacity {}, increment {}",
            self.config.endianness, self.config.initial_capacity, self.config.growth_increment
        );
        ItemManager::with_root(self.root, self.root_name.as_deref(), self.config)
    }
}

impl Default for ItemManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
