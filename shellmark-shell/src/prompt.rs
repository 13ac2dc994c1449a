//! Prompt templates.
//!
//! A template is plain text with placeholders:
//!
//! - `{cwd}`     current directory, home shortened to `~`
//! - `{status}`  exit status of the last command
//! - `{user}`    login name
//!
//! Lines starting with `#` are comments. Remaining lines are joined with
//! newlines, so a two-line template draws a two-line prompt.

use directories::BaseDirs;
use shellmark_core::HookDefinition;
use std::cell::Cell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

/// Values the prompt can show. Cloned handles share the same status.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    last_status: Rc<Cell<i32>>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, status: i32) {
        self.last_status.set(status);
    }

    pub fn status(&self) -> i32 {
        self.last_status.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    body: String,
}

impl PromptTemplate {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let body = source
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");
        Self { source, body }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: &PromptContext) -> String {
        let mut text = self.body.clone();
        if text.contains("{cwd}") {
            text = text.replace("{cwd}", &current_dir_display());
        }
        if text.contains("{user}") {
            text = text.replace("{user}", &user_name());
        }
        text.replace("{status}", &ctx.status().to_string())
    }

    /// Bind this template as a user hook that writes the rendered text.
    pub fn into_hook(self, ctx: PromptContext) -> HookDefinition {
        HookDefinition::user(self.hook_source(), move |out: &mut dyn Write| {
            out.write_all(self.render(&ctx).as_bytes())?;
            out.flush()?;
            Ok(())
        })
    }

    /// What the hook table sees as the body. Any text the template prints
    /// becomes a print statement, so `": "` or `"true"` still counts.
    fn hook_source(&self) -> String {
        if self.body.is_empty() {
            return self.source.clone();
        }
        format!("printf '%s' {:?}", self.body)
    }
}

fn current_dir_display() -> String {
    let Ok(cwd) = std::env::current_dir() else {
        return "?".to_string();
    };
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    shorten_home(&cwd, home.as_deref())
}

pub fn shorten_home(path: &Path, home: Option<&Path>) -> String {
    if let Some(home) = home {
        if let Ok(rest) = path.strip_prefix(home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~{}{}", std::path::MAIN_SEPARATOR, rest.display());
        }
    }
    path.display().to_string()
}

fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string())
}
