use crate::hooks::{HookTable, MODE_PROMPT, PRIMARY_PROMPT};
use std::fmt;
use std::io::Write;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A new prompt cycle begins, before any prompt hook runs.
    Prompt,
    /// A command line is about to be executed.
    PreExec { command_line: String },
    /// The command line finished.
    PostExec { command_line: String, status: i32 },
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::Prompt => EventKind::Prompt,
            LifecycleEvent::PreExec { .. } => EventKind::PreExec,
            LifecycleEvent::PostExec { .. } => EventKind::PostExec,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Prompt,
    PreExec,
    PostExec,
}

/// What a handler wants to happen to its own subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub type Handler =
    Rc<dyn Fn(&mut ShellHost, &LifecycleEvent, &mut dyn Write) -> anyhow::Result<Disposition>>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellSettings {
    /// Whether the shell redraws its own prompt after the terminal reflows it.
    pub handle_reflow: bool,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self { handle_reflow: true }
    }
}

/// What an interactive shell embeds. Driven from one thread, one call at a time.
#[derive(Default)]
pub struct ShellHost {
    pub hooks: HookTable,
    pub settings: ShellSettings,
    subscribers: Vec<Subscription>,
    next_id: u64,
    pending_install: Option<SubscriptionId>,
}

impl fmt::Debug for ShellHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellHost")
            .field("hooks", &self.hooks)
            .field("settings", &self.settings)
            .field("subscribers", &self.subscribers.len())
            .field("pending_install", &self.pending_install)
            .finish()
    }
}

impl ShellHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&mut ShellHost, &LifecycleEvent, &mut dyn Write) -> anyhow::Result<Disposition>
            + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push(Subscription {
            id,
            kind,
            handler: Rc::new(handler),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// True between `install` and the first prompt event.
    pub fn install_pending(&self) -> bool {
        self.pending_install
            .is_some_and(|id| self.subscribers.iter().any(|s| s.id == id))
    }

    pub(crate) fn set_pending_install(&mut self, id: Option<SubscriptionId>) {
        self.pending_install = id;
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.iter().filter(|s| s.kind == kind).count()
    }

    /// Run every subscriber of the event's kind, in subscription order.
    ///
    /// Handlers see the host mutably, so they may subscribe, unsubscribe or
    /// rebind hooks; anything they subscribe first runs on the next dispatch.
    pub fn dispatch(&mut self, event: &LifecycleEvent, out: &mut dyn Write) -> anyhow::Result<()> {
        let kind = event.kind();
        let round: Vec<(SubscriptionId, Handler)> = self
            .subscribers
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| (s.id, s.handler.clone()))
            .collect();

        for (id, handler) in round {
            if handler(self, event, out)? == Disposition::Remove {
                self.unsubscribe(id);
            }
        }

        Ok(())
    }

    pub fn fire_prompt(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        self.dispatch(&LifecycleEvent::Prompt, out)
    }

    pub fn render_mode_prompt(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        self.hooks.invoke(MODE_PROMPT, out)
    }

    pub fn render_primary_prompt(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        self.hooks.invoke(PRIMARY_PROMPT, out)
    }

    pub fn fire_preexec(&mut self, command_line: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        self.dispatch(
            &LifecycleEvent::PreExec {
                command_line: command_line.to_string(),
            },
            out,
        )
    }

    pub fn fire_postexec(
        &mut self,
        command_line: &str,
        status: i32,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        self.dispatch(
            &LifecycleEvent::PostExec {
                command_line: command_line.to_string(),
                status,
            },
            out,
        )
    }
}
