use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use services::DEFAULT_STORAGE_TIMEOUT;

pub(crate) const DB_URL_ENV: &str = "LEARNHUB_DB_URL";
pub(crate) const TIMEOUT_ENV: &str = "LEARNHUB_TIMEOUT_MS";
pub(crate) const CATALOG_ENV: &str = "LEARNHUB_CATALOG";
const DEFAULT_DB_URL: &str = "sqlite://learnhub.sqlite3";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingOperand { command: &'static str, operand: &'static str },
    UnexpectedOperand(String),
    UnknownArg(String),
    InvalidNumber { what: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    ResetNotConfirmed,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "a command is required"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingOperand { command, operand } => {
                write!(f, "{command} requires <{operand}>")
            }
            ArgsError::UnexpectedOperand(arg) => write!(f, "unexpected argument: {arg}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { what, raw } => write!(f, "invalid {what} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::ResetNotConfirmed => {
                write!(f, "reset erases all progress; pass --yes to confirm")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Login { learner: String },
    Logout,
    Whoami,
    Modules,
    Complete { module: String },
    Quiz { module: String, score: i64, total: i64 },
    Summary,
    Show,
    Reset,
    Help,
}

impl Command {
    fn from_operands(operands: Vec<String>, confirmed: bool) -> Result<Self, ArgsError> {
        let mut operands = operands.into_iter();
        let Some(name) = operands.next() else {
            return Err(ArgsError::MissingCommand);
        };

        let command = match name.as_str() {
            "login" => Self::Login {
                learner: require_operand(&mut operands, "login", "learner")?,
            },
            "logout" => Self::Logout,
            "whoami" => Self::Whoami,
            "modules" => Self::Modules,
            "complete" => Self::Complete {
                module: require_operand(&mut operands, "complete", "module")?,
            },
            "quiz" => {
                let module = require_operand(&mut operands, "quiz", "module")?;
                let score = parse_number(require_operand(&mut operands, "quiz", "score")?, "score")?;
                let total = parse_number(require_operand(&mut operands, "quiz", "total")?, "total")?;
                Self::Quiz {
                    module,
                    score,
                    total,
                }
            }
            "summary" => Self::Summary,
            "show" => Self::Show,
            "reset" if confirmed => Self::Reset,
            "reset" => return Err(ArgsError::ResetNotConfirmed),
            "help" => Self::Help,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        if let Some(extra) = operands.next() {
            return Err(ArgsError::UnexpectedOperand(extra));
        }
        Ok(command)
    }
}

/// Everything the binary needs, resolved from environment variables then flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub(crate) db_url: String,
    pub(crate) storage_timeout: Duration,
    pub(crate) catalog_path: Option<PathBuf>,
    pub(crate) learner: Option<String>,
    pub(crate) command: Command,
}

impl Config {
    pub(crate) fn from_env_and_args(
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        Self::parse(args, |key| std::env::var(key).ok())
    }

    fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env(DB_URL_ENV).map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut storage_timeout = match env(TIMEOUT_ENV) {
            Some(raw) => parse_timeout(raw)?,
            None => DEFAULT_STORAGE_TIMEOUT,
        };
        let mut catalog_path = env(CATALOG_ENV).map(PathBuf::from);
        let mut learner = None;
        let mut confirmed = false;
        let mut help = false;
        let mut operands = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--timeout-ms" => {
                    storage_timeout = parse_timeout(require_value(&mut args, "--timeout-ms")?)?;
                }
                "--catalog" => {
                    catalog_path = Some(PathBuf::from(require_value(&mut args, "--catalog")?));
                }
                "--learner" => learner = Some(require_value(&mut args, "--learner")?),
                "--yes" | "-y" => confirmed = true,
                "--help" | "-h" => help = true,
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => operands.push(arg),
            }
        }

        let command = if help {
            Command::Help
        } else {
            Command::from_operands(operands, confirmed)?
        };
        Ok(Self {
            db_url,
            storage_timeout,
            catalog_path,
            learner,
            command,
        })
    }
}

pub(crate) fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  learnhub login <learner>");
    eprintln!("  learnhub logout | whoami | modules");
    eprintln!("  learnhub complete <module>            [--learner <id>]");
    eprintln!("  learnhub quiz <module> <score> <total> [--learner <id>]");
    eprintln!("  learnhub summary | show               [--learner <id>]");
    eprintln!("  learnhub reset --yes                  [--learner <id>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>      default {DEFAULT_DB_URL}");
    eprintln!("  --timeout-ms <ms>      default {}", DEFAULT_STORAGE_TIMEOUT.as_millis());
    eprintln!("  --catalog <file.json>  default: built-in modules");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_URL_ENV}, {TIMEOUT_ENV}, {CATALOG_ENV}, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_operand(
    operands: &mut impl Iterator<Item = String>,
    command: &'static str,
    operand: &'static str,
) -> Result<String, ArgsError> {
    operands
        .next()
        .ok_or(ArgsError::MissingOperand { command, operand })
}

fn parse_number(raw: String, what: &'static str) -> Result<i64, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { what, raw })
}

fn parse_timeout(raw: String) -> Result<Duration, ArgsError> {
    let millis: u64 = raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
        what: "timeout",
        raw: raw.clone(),
    })?;
    if millis == 0 {
        return Err(ArgsError::InvalidNumber {
            what: "timeout",
            raw,
        });
    }
    Ok(Duration::from_millis(millis))
}

pub(crate) fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, ArgsError> {
        Config::parse(args.iter().map(|a| (*a).to_owned()), |_| None)
    }

    #[test]
    fn parses_quiz_with_flags() {
        let config = parse(&["quiz", "hashing", "4", "5", "--learner", "abc123"]).unwrap();
        assert_eq!(
            config.command,
            Command::Quiz {
                module: "hashing".into(),
                score: 4,
                total: 5
            }
        );
        assert_eq!(config.learner.as_deref(), Some("abc123"));
        assert_eq!(config.storage_timeout, DEFAULT_STORAGE_TIMEOUT);
        assert_eq!(config.db_url, DEFAULT_DB_URL);
    }

    #[test]
    fn negative_scores_reach_the_engine() {
        let config = parse(&["quiz", "hashing", "-1", "5"]).unwrap();
        assert!(matches!(config.command, Command::Quiz { score: -1, .. }));
    }

    #[test]
    fn reset_requires_confirmation() {
        assert_eq!(parse(&["reset"]), Err(ArgsError::ResetNotConfirmed));
        assert_eq!(parse(&["reset", "--yes"]).unwrap().command, Command::Reset);
    }

    #[test]
    fn env_is_overridden_by_flags() {
        let env = |key: &str| match key {
            DB_URL_ENV => Some("sqlite:///tmp/from-env.sqlite3".to_owned()),
            TIMEOUT_ENV => Some("250".to_owned()),
            _ => None,
        };
        let config = Config::parse(
            ["summary", "--timeout-ms", "900"].map(str::to_owned),
            env,
        )
        .unwrap();
        assert_eq!(config.db_url, "sqlite:///tmp/from-env.sqlite3");
        assert_eq!(config.storage_timeout, Duration::from_millis(900));
    }

    #[test]
    fn help_wins_over_operands() {
        assert_eq!(parse(&["quiz", "--help"]).unwrap().command, Command::Help);
        assert_eq!(parse(&["help"]).unwrap().command, Command::Help);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse(&[]), Err(ArgsError::MissingCommand));
        assert_eq!(
            parse(&["teleport"]),
            Err(ArgsError::UnknownCommand("teleport".into()))
        );
        assert_eq!(
            parse(&["complete"]),
            Err(ArgsError::MissingOperand {
                command: "complete",
                operand: "module"
            })
        );
        assert_eq!(
            parse(&["whoami", "extra"]),
            Err(ArgsError::UnexpectedOperand("extra".into()))
        );
        assert_eq!(
            parse(&["summary", "--timeout-ms", "0"]),
            Err(ArgsError::InvalidNumber {
                what: "timeout",
                raw: "0".into()
            })
        );
        assert_eq!(
            parse(&["summary", "--verbose"]),
            Err(ArgsError::UnknownArg("--verbose".into()))
        );
    }

    #[test]
    fn bare_paths_become_sqlite_urls() {
        assert_eq!(
            normalize_sqlite_url("/var/lib/learnhub.db".into()),
            "sqlite:///var/lib/learnhub.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:file:mem?mode=memory&cache=shared".into()),
            "sqlite:file:mem?mode=memory&cache=shared"
        );
    }
}
