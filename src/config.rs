use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::QueryError;

/// Options controlling compilation and evaluation of one query unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Maximum number of expression nodes of a function body that may be inlined.
    pub inline_limit: usize,
    /// Allow non-updating functions to perform updates (and vice versa).
    pub mixed_updates: bool,
    /// Mark calls on tail positions so that recursion runs in constant stack.
    pub tail_calls: bool,
    /// Maximum depth of nested, non-tail function invocations.
    pub max_depth: usize,
    /// Bytes of native stack that nested invocations may use before the
    /// evaluation fails with a stack overflow error. Must stay below the
    /// stack size of the thread that evaluates the query.
    pub stack_size: usize,
    /// Seed of the generator behind `random()`.
    pub seed: u64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            inline_limit: 50,
            mixed_updates: false,
            tail_calls: true,
            max_depth: 1024,
            stack_size: 1 << 20,
            seed: 0x2545_f491_4f6c_dd1d,
        }
    }
}

const MIN_STACK_SIZE: usize = 64 * 1024;

// ---- TOML deserialization types ----

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    compile: CompileOptions,
}

impl CompileOptions {
    /// Parse options from the `[compile]` table of a TOML document.
    /// Missing keys keep their defaults; unknown keys are rejected.
    pub fn from_toml(source: &str) -> Result<Self, QueryError> {
        let config: TomlConfig = toml::from_str(source)
            .map_err(|e| QueryError::config(format!("invalid options: {}", e.message())))?;
        config.compile.validate()?;
        Ok(config.compile)
    }

    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, QueryError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| QueryError::config(format!("cannot read '{}': {e}", path.display())))?;
        Self::from_toml(&source)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.max_depth == 0 {
            return Err(QueryError::config("max_depth must be at least 1"));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(QueryError::config(format!("stack_size must be at least {MIN_STACK_SIZE}")));
        }
        Ok(())
    }
}
