pub mod codex;

use std::borrow::Cow;

use itertools::Itertools;
use shell_escape::unix::escape as shell_escape;

/// A fully-resolved command that reopens a session in its CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePlan {
    pub program: String,
    pub args: Vec<String>,
}

impl ResumePlan {
    /// Shell-escaped rendering suitable for copy and paste.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| shell_escape(Cow::Borrowed(part.as_str())))
            .join(" ")
    }
}
