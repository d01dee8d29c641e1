//! Collection configuration.

/// Configuration for a [`Collection`](crate::Collection).
#[derive(Debug, Clone)]
pub struct Config {
    /// Page size used by page emulation when none is given.
    pub default_per_page: u32,

    /// Maximum candidate ids tried before an auto-id create fails.
    pub max_id_attempts: u32,

    /// Read capacity units for `create_table`.
    pub read_capacity: u64,

    /// Write capacity units for `create_table`.
    pub write_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_per_page: 30,
            max_id_attempts: 64,
            read_capacity: 4,
            write_capacity: 4,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default page size. Values below 1 are ignored.
    #[must_use]
    pub const fn default_per_page(mut self, per_page: u32) -> Self {
        if per_page >= 1 {
            self.default_per_page = per_page;
        }
        self
    }

    /// Sets the auto-id attempt bound.
    #[must_use]
    pub const fn max_id_attempts(mut self, attempts: u32) -> Self {
        self.max_id_attempts = attempts;
        self
    }

    /// Sets the table throughput used by `create_table`.
    #[must_use]
    pub const fn capacity(mut self, read: u64, write: u64) -> Self {
        self.read_capacity = read;
        self.write_capacity = write;
        self
    }
}
