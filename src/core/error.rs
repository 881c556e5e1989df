//! Error handling for mamiya
//!
//! All engine failures are represented by [`MamiyaError`]. Public APIs return
//! [`anyhow::Result`] so that host callbacks can fail with arbitrary errors
//! which then propagate through dispatchers untouched; engine-originated
//! failures are always a `MamiyaError` at the root of the chain and can be
//! recovered with `downcast_ref`:
//!
//! ```rust,no_run
//! use mamiya::core::MamiyaError;
//!
//! fn is_missing_task(err: &anyhow::Error) -> bool {
//!     matches!(
//!         err.downcast_ref::<MamiyaError>(),
//!         Some(MamiyaError::TaskNotFound { .. })
//!     )
//! }
//! ```
//!
//! The CLI converts any error into an [`ErrorContext`] through
//! [`user_friendly_error`], which attaches a suggestion and details and
//! prints them with terminal colors.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for mamiya operations
///
/// # Error Categories
///
/// ## Recipe evaluation
/// - [`RecipeParseError`] - recipe text is not valid recipe syntax
/// - [`UnknownOperation`] - a statement names an operation the DSL doesn't have
/// - [`UndefinedName`] - a bare identifier is neither a local nor an accessor
/// - [`InvalidArgument`] - an operation received arguments of the wrong shape
/// - [`ReentrantEvaluation`] - `evaluate` was re-entered on the same thread
///
/// ## Registries
/// - [`TaskNotFound`] - `invoke` named an unregistered task
/// - [`UnknownHook`] - a hook name was not declared by the definition
/// - [`InvalidHookFilter`] - `only`/`except` options are malformed
///
/// ## Helpers and files
/// - [`HelperNotFound`] - `use` could not resolve a helper on the search path
/// - [`FileSystemError`] - a recipe or helper could not be read
///
/// ## Configuration
/// - [`ConfigError`] - configuration content is invalid
///
/// [`RecipeParseError`]: MamiyaError::RecipeParseError
/// [`UnknownOperation`]: MamiyaError::UnknownOperation
/// [`UndefinedName`]: MamiyaError::UndefinedName
/// [`InvalidArgument`]: MamiyaError::InvalidArgument
/// [`ReentrantEvaluation`]: MamiyaError::ReentrantEvaluation
/// [`TaskNotFound`]: MamiyaError::TaskNotFound
/// [`UnknownHook`]: MamiyaError::UnknownHook
/// [`InvalidHookFilter`]: MamiyaError::InvalidHookFilter
/// [`HelperNotFound`]: MamiyaError::HelperNotFound
/// [`FileSystemError`]: MamiyaError::FileSystemError
/// [`ConfigError`]: MamiyaError::ConfigError
#[derive(Error, Debug)]
pub enum MamiyaError {
    /// `use` could not find `<name>.rb` in any directory of the helper search path.
    #[error("Helper not found: {name}")]
    HelperNotFound {
        /// Helper name as passed to `use`
        name: String,
        /// Directories that were searched, in search order
        searched: Vec<String>,
    },

    /// `invoke` was called with a task name that was never defined.
    #[error("Task not defined: {name}")]
    TaskNotFound {
        /// The requested task name
        name: String,
        /// Closest defined task name, if any is similar enough
        did_you_mean: Option<String>,
    },

    /// A hook was registered or dispatched under a name the definition never declared.
    #[error("Unknown hook: {name}")]
    UnknownHook {
        /// The undeclared hook name
        name: String,
    },

    /// Filter options attached to a hook entry have the wrong shape.
    #[error("Invalid filter options for hook '{hook}': {reason}")]
    InvalidHookFilter {
        /// Hook the entry was being registered on
        hook: String,
        /// What is wrong with the options
        reason: String,
    },

    /// Recipe text could not be parsed.
    #[error("Failed to parse recipe {file}: {reason}")]
    RecipeParseError {
        /// Recipe file name, or `(eval)` for anonymous text
        file: String,
        /// Parser diagnostic including the offending line
        reason: String,
    },

    /// A statement called an operation that is neither a builder operation nor a hook.
    #[error("{location}: undefined operation '{name}'")]
    UnknownOperation {
        /// The operation name
        name: String,
        /// `file:line` of the statement
        location: String,
        /// Closest known operation, if any is similar enough
        did_you_mean: Option<String>,
    },

    /// A bare identifier did not resolve to a local or a variable accessor.
    #[error("{location}: undefined local variable or accessor '{name}'")]
    UndefinedName {
        /// The identifier
        name: String,
        /// `file:line` of the expression
        location: String,
    },

    /// An operation received arguments it cannot use.
    #[error("{location}: invalid arguments to '{operation}': {reason}")]
    InvalidArgument {
        /// The operation name
        operation: String,
        /// `file:line` of the statement, or `host` for API calls
        location: String,
        /// What is wrong with the arguments
        reason: String,
    },

    /// `evaluate`/`load` was entered again by the thread already evaluating on this instance.
    #[error("Recipe evaluation is already in progress on this thread")]
    ReentrantEvaluation,

    /// A recipe or helper file could not be read.
    #[error("File system error during {operation}: {path}")]
    FileSystemError {
        /// What was being done
        operation: String,
        /// The path involved
        path: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Generic error for anything without a dedicated variant
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Error with a user-facing suggestion and details attached.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: MamiyaError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: MamiyaError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for the CLI.
///
/// Known [`MamiyaError`] variants get tailored suggestions; anything else is
/// reported as [`MamiyaError::Other`] with the full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(mamiya_error) = error.downcast_ref::<MamiyaError>() {
        let context = create_error_context(mamiya_error.clone());
        if !matches!(mamiya_error, MamiyaError::FileSystemError { .. }) {
            return context;
        }

        // The io error sits below the FileSystemError in the chain
        let shown = mamiya_error.to_string();
        let causes: Vec<String> = error
            .chain()
            .skip_while(|cause| cause.to_string() != shown)
            .skip(1)
            .map(std::string::ToString::to_string)
            .collect();
        if causes.is_empty() {
            return context;
        }
        return context.with_details(causes.join(": "));
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(MamiyaError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your mamiya configuration file");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(MamiyaError::Other {
        message,
    })
}

fn create_error_context(error: MamiyaError) -> ErrorContext {
    match &error {
        MamiyaError::HelperNotFound {
            name,
            searched,
        } => {
            let details = format!("Searched: {}", searched.join(", "));
            let suggestion = format!(
                "Create {name}.rb in a helpers/ directory next to the recipe, or add its directory with `set :load_path, [...]` or --load-path"
            );
            ErrorContext::new(error).with_details(details).with_suggestion(suggestion)
        }
        MamiyaError::TaskNotFound {
            did_you_mean,
            ..
        } => {
            let suggestion = match did_you_mean {
                Some(candidate) => format!("Did you mean '{candidate}'?"),
                None => "Run `mamiya check <recipe>` to list defined tasks".to_string(),
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        MamiyaError::UnknownOperation {
            did_you_mean,
            ..
        } => {
            let suggestion = did_you_mean.as_ref().map(|c| format!("Did you mean '{c}'?"));
            let ctx = ErrorContext::new(error).with_details(
                "Recipes may call set, set_default, append, task, invoke, use, log and declared hooks",
            );
            match suggestion {
                Some(suggestion) => ctx.with_suggestion(suggestion),
                None => ctx,
            }
        }
        MamiyaError::RecipeParseError {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check for unbalanced do/end, brackets or quotes near the reported line",
        ),
        MamiyaError::ReentrantEvaluation => ErrorContext::new(error)
            .with_details(
                "A recipe, task or hook tried to load another top-level recipe into the same instance",
            )
            .with_suggestion("Use `use` to pull in helper fragments instead of nested evaluation"),
        MamiyaError::UnknownHook {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Declare the hook with `hooks = [...]` in the configuration file"),
        _ => ErrorContext::new(error),
    }
}

impl Clone for MamiyaError {
    fn clone(&self) -> Self {
        match self {
            Self::HelperNotFound {
                name,
                searched,
            } => Self::HelperNotFound {
                name: name.clone(),
                searched: searched.clone(),
            },
            Self::TaskNotFound {
                name,
                did_you_mean,
            } => Self::TaskNotFound {
                name: name.clone(),
                did_you_mean: did_you_mean.clone(),
            },
            Self::UnknownHook {
                name,
            } => Self::UnknownHook {
                name: name.clone(),
            },
            Self::InvalidHookFilter {
                hook,
                reason,
            } => Self::InvalidHookFilter {
                hook: hook.clone(),
                reason: reason.clone(),
            },
            Self::RecipeParseError {
                file,
                reason,
            } => Self::RecipeParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::UnknownOperation {
                name,
                location,
                did_you_mean,
            } => Self::UnknownOperation {
                name: name.clone(),
                location: location.clone(),
                did_you_mean: did_you_mean.clone(),
            },
            Self::UndefinedName {
                name,
                location,
            } => Self::UndefinedName {
                name: name.clone(),
                location: location.clone(),
            },
            Self::InvalidArgument {
                operation,
                location,
                reason,
            } => Self::InvalidArgument {
                operation: operation.clone(),
                location: location.clone(),
                reason: reason.clone(),
            },
            Self::ReentrantEvaluation => Self::ReentrantEvaluation,
            Self::FileSystemError {
                operation,
                path,
            } => Self::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}
