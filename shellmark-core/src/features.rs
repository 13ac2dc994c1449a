// Feature tokens the terminal hands over in `SHELLMARK_INTEGRATION`.

use std::collections::{BTreeSet, HashMap};

pub const INTEGRATION_ENV: &str = "SHELLMARK_INTEGRATION";

pub const NO_PROMPT_MARK: &str = "no-prompt-mark";
pub const NO_CURSOR: &str = "no-cursor";
pub const NO_TITLE: &str = "no-title";
pub const NO_CWD: &str = "no-cwd";

/// Something environment-shaped that can hand out a variable exactly once.
pub trait EnvStore {
    fn take(&mut self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn take(&mut self, key: &str) -> Option<String> {
        let value = std::env::var_os(key)?;
        std::env::remove_var(key);
        // A non-UTF-8 signal is malformed; treat the integration as off.
        value.into_string().ok()
    }
}

impl EnvStore for HashMap<String, String> {
    fn take(&mut self, key: &str) -> Option<String> {
        self.remove(key)
    }
}

/// Read-only after start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    tokens: BTreeSet<String>,
}

impl FeatureSet {
    pub fn parse(raw: &str) -> Self {
        let tokens: BTreeSet<String> = raw.split_whitespace().map(str::to_string).collect();

        for token in &tokens {
            if ![NO_PROMPT_MARK, NO_CURSOR, NO_TITLE, NO_CWD].contains(&token.as_str()) {
                tracing::debug!(%token, "ignoring unknown integration token");
            }
        }

        Self { tokens }
    }

    /// `None` means the terminal never asked for integration.
    pub fn from_env(env: &mut impl EnvStore) -> Option<Self> {
        env.take(INTEGRATION_ENV).map(|raw| Self::parse(&raw))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn prompt_marking_enabled(&self) -> bool {
        !self.contains(NO_PROMPT_MARK)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}
