use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use std::sync::LazyLock;

/// Renders the main prompt.
pub const PRIMARY_PROMPT: &str = "fish_prompt";

/// Renders the optional mode indicator (vi mode etc.) in front of the prompt.
pub const MODE_PROMPT: &str = "fish_mode_prompt";

/// A hook body. Writes prompt text as a side effect.
pub type HookBody = Rc<dyn Fn(&mut dyn Write) -> anyhow::Result<()>>;

/// Lines that carry no behaviour: blanks, comments, and function framing.
static STRUCTURAL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(#.*|function\s.*|end|)\s*$").expect("static regex"));

/// Statements that do nothing.
static PASS_THROUGH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(true|:|return(\s+0)?)\s*;?\s*$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOrigin {
    /// Defined by the user or a prompt framework.
    User,
    /// A wrapper installed by the integration.
    Integration,
}

#[derive(Clone)]
pub struct HookDefinition {
    /// Source text of the body, inspected by the emptiness probe.
    pub source: String,
    pub origin: HookOrigin,
    body: HookBody,
}

impl fmt::Debug for HookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDefinition")
            .field("source", &self.source)
            .field("origin", &self.origin)
            .field("body", &"Rc<dyn Fn>")
            .finish()
    }
}

impl HookDefinition {
    pub fn user<F>(source: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut dyn Write) -> anyhow::Result<()> + 'static,
    {
        Self {
            source: source.into(),
            origin: HookOrigin::User,
            body: Rc::new(body),
        }
    }

    pub fn integration<F>(body: F) -> Self
    where
        F: Fn(&mut dyn Write) -> anyhow::Result<()> + 'static,
    {
        Self {
            source: String::new(),
            origin: HookOrigin::Integration,
            body: Rc::new(body),
        }
    }

    pub fn call(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        (self.body)(out)
    }
}

/// The host's named hooks. One binding per name; defining again overrides.
#[derive(Debug, Default, Clone)]
pub struct HookTable {
    hooks: HashMap<String, HookDefinition>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, def: HookDefinition) {
        self.hooks.insert(name.into(), def);
    }

    /// Swap in a new binding and hand back the old one.
    pub fn replace(&mut self, name: &str, def: HookDefinition) -> Option<HookDefinition> {
        self.hooks.insert(name.to_string(), def)
    }

    pub fn remove(&mut self, name: &str) -> Option<HookDefinition> {
        self.hooks.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&HookDefinition> {
        self.hooks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Run whatever is bound to `name`. Undefined hooks render nothing.
    pub fn invoke(&self, name: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        // Clone the Rc so the body may freely touch the table's owner.
        let body = match self.hooks.get(name) {
            Some(def) => def.body.clone(),
            None => return Ok(()),
        };
        body(out)
    }
}

/// A delegate reproducing a user's prompt behaviour. Shares the callable with
/// whoever defined it; dropping the renderer never destroys the user's hook.
#[derive(Clone)]
pub struct UserRenderer {
    name: String,
    body: HookBody,
}

impl fmt::Debug for UserRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRenderer").field("name", &self.name).finish()
    }
}

impl UserRenderer {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut dyn Write) -> anyhow::Result<()> + 'static,
    {
        Self {
            name: name.into(),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Errors are the user's and are returned untouched.
    pub fn render(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        (self.body)(out)
    }
}

/// True if the body does something observable.
///
/// Blank lines, comments and `function`/`end` framing are ignored; a body
/// made only of `true`, `:` or `return [0]` counts as empty. Prompt
/// frameworks ship empty mode-prompt stubs, and wrapping one of those would
/// move the prompt-start marker to the wrong place.
pub fn is_meaningful(source: &str) -> bool {
    source
        .lines()
        .filter(|line| !STRUCTURAL_LINE.is_match(line))
        .any(|line| !PASS_THROUGH_LINE.is_match(line))
}

/// Capture the behaviour currently bound to `name`.
///
/// Returns `None` when nothing is bound, when the binding is one of our own
/// wrappers, or when the body is not meaningful.
pub fn capture(table: &HookTable, name: &str) -> Option<UserRenderer> {
    let source = &table.get(name)?.source;

    if !is_meaningful(source) {
        tracing::debug!(hook = name, "hook body is empty; treating as absent");
        return None;
    }

    delegate(table, name)
}

/// Like [`capture`], but keeps empty bodies. The primary prompt is always
/// delegated to, even when it renders nothing.
pub fn delegate(table: &HookTable, name: &str) -> Option<UserRenderer> {
    let def = table.get(name)?;

    if def.origin == HookOrigin::Integration {
        tracing::debug!(hook = name, "already wrapped; not capturing");
        return None;
    }

    Some(UserRenderer {
        name: name.to_string(),
        body: def.body.clone(),
    })
}
