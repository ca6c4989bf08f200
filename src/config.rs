use std::{
    env,
    error::Error,
    fmt,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

/// The environment variable holding the optional fatigue seed.
pub const SEED_VAR: &str = "LAE_SEED";

/// The command line usage.
pub const USAGE: &str = "usage: lae <threads> <input.json> <output.json>";

/// Invalid command line or environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErr {
    Usage { got: usize },
    InvalidThreads { value: String, output: PathBuf },
    InvalidSeed { value: String, output: PathBuf },
}

impl ConfigErr {
    /// Returns the output path the failure should be reported to, if it
    /// was given.
    pub fn output(&self) -> Option<&Path> {
        match self {
            ConfigErr::Usage { .. } => None,
            ConfigErr::InvalidThreads { output, .. } | ConfigErr::InvalidSeed { output, .. } => {
                Some(output)
            }
        }
    }
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErr::Usage { got } => write!(f, "expected 3 arguments, got {got}"),
            ConfigErr::InvalidThreads { value, .. } => {
                write!(f, "invalid number of threads: {value}")
            }
            ConfigErr::InvalidSeed { value, .. } => write!(f, "invalid {SEED_VAR}: {value}"),
        }
    }
}

impl Error for ConfigErr {}

/// The settings of a single run.
#[derive(Debug, Clone)]
pub struct Config {
    threads: NonZeroUsize,
    input: PathBuf,
    output: PathBuf,
    seed: Option<u64>,
}

impl Config {
    /// Creates a new run configuration with OS seeded fatigue.
    ///
    /// # Args
    /// * `threads` - Number of worker threads.
    /// * `input` - Path of the input document.
    /// * `output` - Path of the output document.
    ///
    /// # Returns
    /// A `Config` instance.
    pub fn new(threads: NonZeroUsize, input: PathBuf, output: PathBuf) -> Self {
        Self {
            threads,
            input,
            output,
            seed: None,
        }
    }

    /// Sets the seed of the fatigue generator.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the configuration from the process arguments and environment.
    pub fn from_env() -> Result<Self, ConfigErr> {
        Self::parse(env::args().skip(1), env::var(SEED_VAR).ok().as_deref())
    }

    /// Builds the configuration from positional arguments.
    ///
    /// # Args
    /// * `args` - `<threads> <input.json> <output.json>`, without the program name.
    /// * `seed` - The raw value of the seed variable, if set.
    ///
    /// # Returns
    /// A `Usage` error if the argument count is wrong, otherwise an error
    /// carrying the output path for invalid values.
    pub fn parse<I>(args: I, seed: Option<&str>) -> Result<Self, ConfigErr>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        let [threads, input, output] = <[String; 3]>::try_from(args)
            .map_err(|args| ConfigErr::Usage { got: args.len() })?;

        let output = PathBuf::from(output);
        let Some(threads) = threads.trim().parse().ok().and_then(NonZeroUsize::new) else {
            return Err(ConfigErr::InvalidThreads {
                value: threads,
                output,
            });
        };

        let seed = match seed {
            Some(value) => match value.trim().parse() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    return Err(ConfigErr::InvalidSeed {
                        value: value.to_string(),
                        output,
                    });
                }
            },
            None => None,
        };

        Ok(Self::new(threads, input.into(), output).with_seed(seed))
    }

    /// Returns the number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads.get()
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}
