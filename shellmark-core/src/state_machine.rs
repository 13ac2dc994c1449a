use crate::emitter::MarkerEmitter;
use crate::hooks::UserRenderer;
use crate::marker::Marker;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No prompt drawn yet this session.
    #[default]
    Uninitialized,
    /// 133;A written, prompt text being drawn.
    PromptStart,
    /// 133;B written, waiting for the user's command line.
    PromptEnd,
    /// 133;C written, command running.
    PreExec,
    /// 133;D;<status> written.
    PostExec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptEvent {
    /// The mode indicator is about to render. Only wrapped when the user has one.
    ModeRender,
    /// The primary prompt is about to render. Also fires on redraw (resize).
    PrimaryRender { mode_renderer_present: bool },
    /// A typed command is about to run.
    PreExec,
    /// The command finished with this exit status.
    PostExec(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Enter(LifecycleState),
    Emit(Marker),
    /// Call the user renderer that belongs to the event.
    Render,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: LifecycleState,
    pub steps: Vec<Step>,
}

impl Transition {
    /// State after all steps ran.
    pub fn next_state(&self) -> LifecycleState {
        self.steps
            .iter()
            .rev()
            .find_map(|step| match step {
                Step::Enter(s) => Some(*s),
                _ => None,
            })
            .unwrap_or(self.from)
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::Emit(m) => Some(*m),
                _ => None,
            })
            .collect()
    }
}

impl LifecycleState {
    /// The full transition table.
    pub fn on(self, event: PromptEvent) -> Transition {
        let mut steps = Vec::new();

        match event {
            PromptEvent::ModeRender
            | PromptEvent::PrimaryRender {
                mode_renderer_present: false,
            } => {
                // A command region that never got its 133;D is closed before
                // the next prompt. After PostExec it is already closed, and in
                // PromptStart/PromptEnd this is a redraw of the same prompt.
                if self == LifecycleState::PreExec {
                    steps.push(Step::Emit(Marker::output_end(None)));
                }
                steps.push(Step::Enter(LifecycleState::PromptStart));
                steps.push(Step::Emit(Marker::prompt_start()));
                steps.push(Step::Render);

                if event != PromptEvent::ModeRender {
                    steps.push(Step::Enter(LifecycleState::PromptEnd));
                    steps.push(Step::Emit(Marker::secondary_prompt()));
                }
            }
            PromptEvent::PrimaryRender {
                mode_renderer_present: true,
            } => {
                steps.push(Step::Render);
                steps.push(Step::Enter(LifecycleState::PromptEnd));
                steps.push(Step::Emit(Marker::secondary_prompt()));
            }
            PromptEvent::PreExec => {
                steps.push(Step::Enter(LifecycleState::PreExec));
                steps.push(Step::Emit(Marker::output_start()));
            }
            PromptEvent::PostExec(status) => {
                steps.push(Step::Enter(LifecycleState::PostExec));
                steps.push(Step::Emit(Marker::output_end(Some(status))));
            }
        }

        Transition { from: self, steps }
    }
}

/// Owns the lifecycle state for one interactive session.
#[derive(Debug)]
pub struct PromptStateMachine {
    state: LifecycleState,
    emitter: MarkerEmitter,
    primary: UserRenderer,
    mode: Option<UserRenderer>,
}

impl PromptStateMachine {
    pub fn new(emitter: MarkerEmitter, primary: UserRenderer, mode: Option<UserRenderer>) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            emitter,
            primary,
            mode,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn has_mode_renderer(&self) -> bool {
        self.mode.is_some()
    }

    /// Without a captured mode renderer this is a no-op; the primary path
    /// writes the prompt start instead.
    pub fn on_mode_render(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some(mode) = self.mode.clone() else {
            return Ok(());
        };
        self.run(PromptEvent::ModeRender, &mode, out)
    }

    pub fn on_primary_render(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        let event = PromptEvent::PrimaryRender {
            mode_renderer_present: self.mode.is_some(),
        };
        let primary = self.primary.clone();
        self.run(event, &primary, out)
    }

    pub fn on_preexec(&mut self, out: &mut dyn Write) {
        self.apply(PromptEvent::PreExec, out);
    }

    pub fn on_postexec(&mut self, status: i32, out: &mut dyn Write) {
        self.apply(PromptEvent::PostExec(status), out);
    }

    /// Events with a renderer step.
    fn run(
        &mut self,
        event: PromptEvent,
        renderer: &UserRenderer,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        for step in self.transition(event).steps {
            match step {
                Step::Render => renderer.render(out)?,
                other => self.step(other, out),
            }
        }
        Ok(())
    }

    /// Events that only move state and write markers.
    fn apply(&mut self, event: PromptEvent, out: &mut dyn Write) {
        for step in self.transition(event).steps {
            self.step(step, out);
        }
    }

    fn transition(&self, event: PromptEvent) -> Transition {
        let transition = self.state.on(event);
        tracing::debug!(
            from = ?transition.from,
            to = ?transition.next_state(),
            ?event,
            "prompt transition"
        );
        transition
    }

    fn step(&mut self, step: Step, out: &mut dyn Write) {
        match step {
            Step::Enter(state) => self.state = state,
            Step::Emit(marker) => self.emitter.emit(out, marker),
            Step::Render => {}
        }
    }
}
