//! Translator configuration.
//!
//! [`TranslatorConfig`] controls the few tunables of the trace translator: the upper bound
//! used for array length guards and the limits of the descriptor converter that turns concrete
//! runtime values into symbolic constants.
//!
//! # Presets
//!
//! - [`TranslatorConfig::default`] - Limits matching the usual JVM instrumentation setup
//! - [`TranslatorConfig::shallow`] - Small descriptor limits for very large object graphs
//! - [`TranslatorConfig::deep`] - Generous limits when complete heap snapshots are wanted
//!
//! # Examples
//!
//! ```rust,ignore
//! use symtrace::TranslatorConfig;
//!
//! let config = TranslatorConfig::default()
//!     .with_max_array_length(4096)
//!     .with_descriptor_depth(4);
//! ```

/// Default upper bound for symbolic array lengths.
pub const DEFAULT_MAX_ARRAY_LENGTH: i32 = 10_000;

/// Default recursion cap of the descriptor converter.
pub const DEFAULT_DESCRIPTOR_DEPTH: usize = 10;

/// Default number of array elements the descriptor converter keeps.
pub const DEFAULT_DESCRIPTOR_ARRAY_LENGTH: usize = 1_000;

/// Limits of the descriptor converter.
///
/// Object graphs are converted recursively; once `max_depth` is exceeded the converter emits
/// a null descriptor instead of descending further, and arrays keep at most
/// `max_array_length` elements. Both limits bound the work spent on cyclic or very large
/// graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorLimits {
    /// Maximum nesting depth of converted objects and arrays
    pub max_depth: usize,
    /// Maximum number of array elements converted per array
    pub max_array_length: usize,
}

impl Default for DescriptorLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_DESCRIPTOR_DEPTH,
            max_array_length: DEFAULT_DESCRIPTOR_ARRAY_LENGTH,
        }
    }
}

/// Configuration of a [`crate::trace::SymbolicTraceBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Exclusive upper bound asserted by array length guards
    pub max_array_length: i32,
    /// Limits applied when converting concrete values
    pub descriptor: DescriptorLimits,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            descriptor: DescriptorLimits::default(),
        }
    }
}

impl TranslatorConfig {
    /// Configuration with small descriptor limits.
    ///
    /// Useful when traces touch large object graphs and only the top-level concrete values
    /// matter for seeding solutions.
    #[must_use]
    pub fn shallow() -> Self {
        Self {
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            descriptor: DescriptorLimits {
                max_depth: 2,
                max_array_length: 64,
            },
        }
    }

    /// Configuration with generous descriptor limits.
    #[must_use]
    pub fn deep() -> Self {
        Self {
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            descriptor: DescriptorLimits {
                max_depth: 32,
                max_array_length: 100_000,
            },
        }
    }

    /// Sets the exclusive upper bound used by array length guards.
    #[must_use]
    pub fn with_max_array_length(mut self, length: i32) -> Self {
        self.max_array_length = length;
        self
    }

    /// Sets the recursion cap of the descriptor converter.
    #[must_use]
    pub fn with_descriptor_depth(mut self, depth: usize) -> Self {
        self.descriptor.max_depth = depth;
        self
    }

    /// Sets the per-array element cap of the descriptor converter.
    #[must_use]
    pub fn with_descriptor_array_length(mut self, length: usize) -> Self {
        self.descriptor.max_array_length = length;
        self
    }
}
