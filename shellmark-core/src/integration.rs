use crate::emitter::MarkerEmitter;
use crate::error::IntegrationError;
use crate::features::FeatureSet;
use crate::hooks::{self, HookDefinition, HookOrigin, UserRenderer, MODE_PROMPT, PRIMARY_PROMPT};
use crate::lifecycle::{Disposition, EventKind, LifecycleEvent, ShellHost};
use crate::state_machine::PromptStateMachine;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// No signal, or prompt marking switched off. Nothing was touched.
    Disabled,
    /// Wrappers go in on the next prompt event.
    Pending,
    /// Installed or scheduled already; nothing new was added.
    AlreadyInstalled,
}

/// Schedule prompt marking. The wrappers go in on the first prompt event,
/// once the user's configuration has bound its prompt hooks.
pub fn install(host: &mut ShellHost, features: Option<&FeatureSet>) -> InstallOutcome {
    let Some(features) = features else {
        tracing::info!("terminal did not request shell integration");
        return InstallOutcome::Disabled;
    };

    if !features.prompt_marking_enabled() {
        tracing::info!("prompt marking disabled by feature token");
        return InstallOutcome::Disabled;
    }

    let wrapped = host
        .hooks
        .get(PRIMARY_PROMPT)
        .is_some_and(|def| def.origin == HookOrigin::Integration);
    if wrapped || host.install_pending() {
        tracing::debug!("prompt marking already installed");
        return InstallOutcome::AlreadyInstalled;
    }

    let id = host.subscribe(EventKind::Prompt, |host, _, _| {
        activate(host);
        Ok(Disposition::Remove)
    });
    host.set_pending_install(Some(id));

    tracing::info!("prompt marking scheduled");
    InstallOutcome::Pending
}

/// Capture the user's renderers and put the wrappers in their place.
fn activate(host: &mut ShellHost) {
    host.set_pending_install(None);

    let primary = hooks::delegate(&host.hooks, PRIMARY_PROMPT)
        .unwrap_or_else(|| UserRenderer::new(PRIMARY_PROMPT, |_| Ok(())));
    let mode = hooks::capture(&host.hooks, MODE_PROMPT);
    let wrap_mode = mode.is_some();

    let machine = Rc::new(RefCell::new(PromptStateMachine::new(
        MarkerEmitter::new(),
        primary,
        mode,
    )));

    if wrap_mode {
        let sm = machine.clone();
        host.hooks.replace(
            MODE_PROMPT,
            HookDefinition::integration(move |out| {
                sm.try_borrow_mut()
                    .map_err(|_| IntegrationError::Reentrant(MODE_PROMPT))?
                    .on_mode_render(out)
            }),
        );
    }

    let sm = machine.clone();
    host.hooks.replace(
        PRIMARY_PROMPT,
        HookDefinition::integration(move |out| {
            sm.try_borrow_mut()
                .map_err(|_| IntegrationError::Reentrant(PRIMARY_PROMPT))?
                .on_primary_render(out)
        }),
    );

    let sm = machine.clone();
    host.subscribe(EventKind::PreExec, move |_, _, out| {
        sm.try_borrow_mut()
            .map_err(|_| IntegrationError::Reentrant("preexec"))?
            .on_preexec(out);
        Ok(Disposition::Keep)
    });

    let sm = machine;
    host.subscribe(EventKind::PostExec, move |_, event, out| {
        if let LifecycleEvent::PostExec { status, .. } = event {
            sm.try_borrow_mut()
                .map_err(|_| IntegrationError::Reentrant("postexec"))?
                .on_postexec(*status, out);
        }
        Ok(Disposition::Keep)
    });

    // The terminal reflows marked prompts itself.
    host.settings.handle_reflow = false;

    tracing::info!(mode_prompt_wrapped = wrap_mode, "prompt marking installed");
}
