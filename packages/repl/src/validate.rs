//! Argument validation combinators.
//!
//! A command declares its argument shape by chaining checks:
//!
//! ```rust
//! use bucketsh_repl::validate::Validates;
//!
//! let check = Validates::new()
//!     .min_args(2)
//!     .choices(0, &["bucket", "key"])
//!     .finish();
//!
//! let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
//! assert!(check(&args(&["key", "users", "alice"])).is_ok());
//! assert!(check(&args(&["file", "x"])).is_err());
//! ```
//!
//! Checks run in the order they were added and stop at the first failure.
//! They only describe what went wrong; the dispatcher decides how to show it.

/// Why a set of arguments was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expect {expected} arguments, got {got}")]
    Exact { expected: usize, got: usize },

    #[error("expect minimum {min} arguments, got {got}")]
    TooFew { min: usize, got: usize },

    #[error("expect max {max} arguments, got {got}")]
    TooMany { max: usize, got: usize },

    #[error("expect {expected:?} arguments, got {got}")]
    NotOneOf { expected: Vec<usize>, got: usize },

    #[error("argument {} should be one of [{}]", .position + 1, .choices.join(", "))]
    Choice {
        position: usize,
        choices: Vec<String>,
    },

    #[error("{0}")]
    Other(String),
}

type Check = Box<dyn Fn(&[String]) -> Result<(), ValidationError>>;

/// An ordered chain of argument checks.
#[derive(Default)]
pub struct Validates {
    checks: Vec<Check>,
}

impl Validates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a custom check to the end of the chain.
    pub fn append(
        mut self,
        check: impl Fn(&[String]) -> Result<(), ValidationError> + 'static,
    ) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Exactly `n` arguments.
    pub fn num_args(self, n: usize) -> Self {
        self.append(move |args| {
            if args.len() != n {
                return Err(ValidationError::Exact {
                    expected: n,
                    got: args.len(),
                });
            }
            Ok(())
        })
    }

    /// At least `n` arguments.
    pub fn min_args(self, n: usize) -> Self {
        self.append(move |args| {
            if args.len() < n {
                return Err(ValidationError::TooFew {
                    min: n,
                    got: args.len(),
                });
            }
            Ok(())
        })
    }

    /// At most `n` arguments.
    pub fn max_args(self, n: usize) -> Self {
        self.append(move |args| {
            if args.len() > n {
                return Err(ValidationError::TooMany {
                    max: n,
                    got: args.len(),
                });
            }
            Ok(())
        })
    }

    /// Exactly one of the listed argument counts.
    pub fn num_args_choice(self, counts: &[usize]) -> Self {
        let counts = counts.to_vec();
        self.append(move |args| {
            if counts.contains(&args.len()) {
                return Ok(());
            }
            Err(ValidationError::NotOneOf {
                expected: counts.clone(),
                got: args.len(),
            })
        })
    }

    /// If an argument exists at `position`, it must be one of `allowed`.
    ///
    /// A missing argument passes; pair with a count check when the argument
    /// is mandatory.
    pub fn choices(self, position: usize, allowed: &[&str]) -> Self {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
        self.append(move |args| match args.get(position) {
            Some(arg) if !allowed.contains(arg) => Err(ValidationError::Choice {
                position,
                choices: allowed.clone(),
            }),
            _ => Ok(()),
        })
    }

    /// Compile the chain into one function.
    pub fn finish(self) -> impl Fn(&[String]) -> Result<(), ValidationError> + 'static {
        move |args: &[String]| self.checks.iter().try_for_each(|check| check(args))
    }
}
