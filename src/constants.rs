//! Global constants used throughout the mamiya codebase.

/// File extension of recipe and helper files.
///
/// Existing deployment scripts are named `deploy.rb`, `helpers/git.rb` and so
/// on; the contents are the restricted recipe grammar, not Ruby.
pub const RECIPE_EXTENSION: &str = "rb";

/// Directory name searched next to the evaluating recipe by `use`.
pub const HELPERS_DIR_NAME: &str = "helpers";

/// Variable holding user-configured helper search directories.
pub const LOAD_PATH_VARIABLE: &str = "load_path";

/// Local binding that carries `use` options into a helper.
pub const OPTIONS_LOCAL: &str = "options";

/// Pseudo file name reported for recipe text evaluated without a file name.
pub const ANONYMOUS_SOURCE: &str = "(eval)";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "MAMIYA_CONFIG";

/// Maximum Levenshtein distance, as a percentage of the requested name's
/// length, for a "did you mean" suggestion.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Default directory for machine-wide helpers, `<data dir>/mamiya/helpers`.
///
/// Resolved at runtime for the current user; the helpers bundled with the
/// binary do not depend on it.
#[must_use]
pub fn builtin_helpers_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("mamiya"))
        .unwrap_or_else(|| std::path::PathBuf::from(".mamiya"))
        .join(HELPERS_DIR_NAME)
}
