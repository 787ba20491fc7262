//! Configuration options for evaluating and compiling expressions.

/// Options that change what an evaluation does.
///
/// # Example
///
/// ```
/// use quill_core::api::EvaluationOptions;
///
/// let options = EvaluationOptions {
///     auto_grow_null_references: true,
///     auto_grow_collections: true,
///     max_auto_grow_size: 64,
///     ..EvaluationOptions::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Create missing intermediate values (lists, maps, objects) when a
    /// writable property is null and the path continues past it.
    ///
    /// Default: false
    pub auto_grow_null_references: bool,

    /// Grow lists with nulls when an index past the end is used.
    ///
    /// Default: false
    pub auto_grow_collections: bool,

    /// Largest size a list may be grown to.
    ///
    /// Default: `i32::MAX`
    pub max_auto_grow_size: usize,

    /// Maximum nesting depth of node evaluation (recursion protection).
    ///
    /// Default: 1000
    pub max_depth: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            auto_grow_null_references: false,
            auto_grow_collections: false,
            max_auto_grow_size: i32::MAX as usize,
            max_depth: 1000,
        }
    }
}

/// When an expression is compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompilerMode {
    /// Always interpret.
    #[default]
    Off,
    /// Compile after the first successful interpretation. Evaluation errors
    /// raised by compiled code propagate to the caller.
    Immediate,
    /// Compile after `threshold` interpretations; any failure of compiled
    /// code reverts to interpretation.
    Mixed,
}

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use quill_core::api::{CompilationOptions, CompilerMode};
///
/// let options = CompilationOptions {
///     mode: CompilerMode::Mixed,
///     threshold: 10,
///     ..CompilationOptions::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOptions {
    pub mode: CompilerMode,

    /// Successful interpretations before `Mixed` mode tries to compile.
    ///
    /// Default: 100
    pub threshold: u32,

    /// Failed compilation attempts (or faults in compiled code) after which
    /// compilation is no longer attempted.
    ///
    /// Default: 100
    pub max_failed_attempts: u32,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            mode: CompilerMode::Off,
            threshold: 100,
            max_failed_attempts: 100,
        }
    }
}

/// All per-expression options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionOptions {
    pub evaluation: EvaluationOptions,
    pub compilation: CompilationOptions,
}
