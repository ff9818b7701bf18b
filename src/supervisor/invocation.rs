//! Translation of a [`ProcessRequest`] into the argv actually executed.
//!
//! | shell | elevation          | argv                                   |
//! |-------|--------------------|----------------------------------------|
//! | yes   | none               | `bash -lc CMD`                         |
//! | yes   | pkexec             | `pkexec bash -lc CMD`                  |
//! | yes   | sudo + credential  | `sudo -S -p "" bash -lc CMD` (+ stdin) |
//! | yes   | sudo               | `sudo bash -lc CMD`                    |
//! | no    | any                | same prefixes, CMD split into words    |

use super::error::SupervisorError;
use super::request::{ElevationMethod, ProcessRequest};

/// Login shell used for shell-wrapped requests.
const SHELL: &str = "bash";

/// A fully resolved program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to exec.
    pub program: String,
    /// Arguments after the program.
    pub args: Vec<String>,
    /// Bytes written to the child's stdin right after spawn.
    pub stdin: Option<String>,
}

impl Invocation {
    /// Build the invocation for `request`.
    ///
    /// An elevated request is always nested inside exactly one wrapper.
    pub fn from_request(request: &ProcessRequest) -> Result<Self, SupervisorError> {
        let command = request.command().trim();
        if command.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }

        let mut argv: Vec<String> = Vec::new();
        let mut stdin = None;

        match request.elevation() {
            ElevationMethod::None => {}
            ElevationMethod::Pkexec => argv.push("pkexec".to_string()),
            ElevationMethod::Sudo => {
                argv.push("sudo".to_string());
                if let Some(secret) = request.secret() {
                    argv.extend(["-S", "-p", ""].map(String::from));
                    stdin = Some(format!("{}\n", secret));
                }
            }
        }

        if request.is_shell() {
            argv.extend([SHELL, "-lc", command].map(String::from));
        } else {
            let words =
                shlex::split(command).ok_or_else(|| SupervisorError::Split(command.to_string()))?;
            if words.is_empty() {
                return Err(SupervisorError::EmptyCommand);
            }
            argv.extend(words);
        }

        let program = argv.remove(0);
        Ok(Self {
            program,
            args: argv,
            stdin,
        })
    }

    /// Render as a single shell-quoted line for logging.
    #[must_use]
    pub fn to_command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| match shlex::try_quote(word) {
                Ok(quoted) => quoted.into_owned(),
                Err(_) => word.clone(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
