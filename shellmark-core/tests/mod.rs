use shellmark_core::features::{FeatureSet, INTEGRATION_ENV};
use shellmark_core::hooks::{HookDefinition, HookOrigin, UserRenderer, MODE_PROMPT, PRIMARY_PROMPT};
use shellmark_core::integration::{install, InstallOutcome};
use shellmark_core::lifecycle::{EventKind, ShellHost};
use shellmark_core::marker::{Marker, MarkerKind};
use shellmark_core::state_machine::{LifecycleState, PromptStateMachine};
use shellmark_core::term::decode_markers;
use shellmark_core::MarkerEmitter;
use std::collections::HashMap;
use std::io::Write;

// ============================================================================
// Helpers
// ============================================================================

fn host_with(primary: &str, mode: Option<&str>) -> ShellHost {
    let mut host = ShellHost::new();
    let text = primary.to_string();
    host.hooks.define(
        PRIMARY_PROMPT,
        HookDefinition::user(primary, move |out: &mut dyn Write| {
            out.write_all(text.as_bytes())?;
            Ok(())
        }),
    );
    if let Some(source) = mode {
        let text = source.to_string();
        host.hooks.define(
            MODE_PROMPT,
            HookDefinition::user(source, move |out: &mut dyn Write| {
                // Comment-only stubs render nothing.
                if !text.trim_start().starts_with('#') {
                    out.write_all(text.as_bytes())?;
                }
                Ok(())
            }),
        );
    }
    host
}

fn enabled() -> Option<FeatureSet> {
    Some(FeatureSet::parse(""))
}

/// What the host's read-eval loop does to draw one prompt.
fn draw_prompt(host: &mut ShellHost, out: &mut Vec<u8>) {
    host.fire_prompt(out).unwrap();
    host.render_mode_prompt(out).unwrap();
    host.render_primary_prompt(out).unwrap();
}

fn run_command(host: &mut ShellHost, cmd: &str, status: i32, out: &mut Vec<u8>) {
    host.fire_preexec(cmd, out).unwrap();
    out.extend_from_slice(b"command output\n");
    host.fire_postexec(cmd, status, out).unwrap();
}

fn codes(markers: &[Marker]) -> Vec<String> {
    markers
        .iter()
        .map(|m| match m.payload {
            Some(p) => format!("{};{}", m.kind.code(), p),
            None => m.kind.code().to_string(),
        })
        .collect()
}

// ============================================================================
// Marker sequences
// ============================================================================

#[test]
fn test_full_cycle_without_mode_prompt() {
    let mut host = host_with("$ ", None);
    assert_eq!(install(&mut host, enabled().as_ref()), InstallOutcome::Pending);

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    run_command(&mut host, "ls", 0, &mut out);

    assert_eq!(codes(&decode_markers(&out)), vec!["A", "B", "C", "D;0"]);
}

#[test]
fn test_trivial_mode_prompt_gives_identical_sequence() {
    let mut plain = host_with("$ ", None);
    let mut stubbed = host_with("$ ", Some("# compatibility stub"));
    install(&mut plain, enabled().as_ref());
    install(&mut stubbed, enabled().as_ref());

    let mut a = Vec::new();
    let mut b = Vec::new();
    for (host, out) in [(&mut plain, &mut a), (&mut stubbed, &mut b)] {
        draw_prompt(host, out);
        run_command(host, "ls", 3, out);
    }

    assert_eq!(decode_markers(&a), decode_markers(&b));
    assert_eq!(a, b);
    assert_eq!(
        stubbed.hooks.get(MODE_PROMPT).map(|d| d.origin),
        Some(HookOrigin::User)
    );
}

#[test]
fn test_real_mode_prompt_gives_identical_sequence() {
    let mut host = host_with("$ ", Some("[I] "));
    install(&mut host, enabled().as_ref());

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    run_command(&mut host, "ls", 0, &mut out);

    assert_eq!(codes(&decode_markers(&out)), vec!["A", "B", "C", "D;0"]);
    assert_eq!(
        host.hooks.get(MODE_PROMPT).map(|d| d.origin),
        Some(HookOrigin::Integration)
    );
}

#[test]
fn test_prompt_text_lands_between_markers() {
    let mut host = host_with("$ ", Some("[I] "));
    install(&mut host, enabled().as_ref());

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);

    assert_eq!(out, b"\x1b]133;A\x07[I] $ \x1b]133;B\x07");
}

#[test]
fn test_scenario_two_prompts_no_extra_output_end() {
    let mut host = host_with("$ ", Some("[I] "));
    install(&mut host, enabled().as_ref());

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    run_command(&mut host, "ls", 0, &mut out);
    draw_prompt(&mut host, &mut out);

    assert_eq!(
        codes(&decode_markers(&out)),
        vec!["A", "B", "C", "D;0", "A", "B"]
    );
}

#[test]
fn test_first_prompt_never_starts_with_output_end() {
    for mode in [None, Some("[I] ")] {
        let mut host = host_with("$ ", mode);
        install(&mut host, enabled().as_ref());
        let mut out = Vec::new();
        draw_prompt(&mut host, &mut out);
        let markers = decode_markers(&out);
        assert_eq!(markers.first().map(|m| m.kind), Some(MarkerKind::PromptStart));
        assert!(markers.iter().all(|m| m.kind != MarkerKind::OutputEnd));
    }
}

#[test]
fn test_resize_redraw_is_idempotent() {
    let mut host = host_with("$ ", None);
    install(&mut host, enabled().as_ref());

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    // Redraw without a new command line.
    host.render_primary_prompt(&mut out).unwrap();

    let markers = decode_markers(&out);
    let b_count = markers
        .iter()
        .filter(|m| m.kind == MarkerKind::SecondaryPrompt)
        .count();
    assert_eq!(b_count, 2);
    assert!(markers.iter().all(|m| m.kind != MarkerKind::OutputEnd));
}

#[test]
fn test_resize_redraw_with_mode_prompt() {
    let mut host = host_with("$ ", Some("[N] "));
    install(&mut host, enabled().as_ref());

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    host.render_mode_prompt(&mut out).unwrap();
    host.render_primary_prompt(&mut out).unwrap();

    assert_eq!(codes(&decode_markers(&out)), vec!["A", "B", "A", "B"]);
}

#[test]
fn test_exit_status_round_trip() {
    for status in [0, 1, 127, 130] {
        let mut host = host_with("$ ", None);
        install(&mut host, enabled().as_ref());
        let mut out = Vec::new();
        draw_prompt(&mut host, &mut out);
        run_command(&mut host, "false", status, &mut out);

        let last = decode_markers(&out).pop().unwrap();
        assert_eq!(last, Marker::output_end(Some(status)));
        let tail = format!("\x1b]133;D;{status}\x07");
        assert!(out.ends_with(tail.as_bytes()));
    }
}

#[test]
fn test_interrupted_command_closed_before_next_prompt() {
    let mut host = host_with("$ ", None);
    install(&mut host, enabled().as_ref());

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    host.fire_preexec("sleep 100", &mut out).unwrap();
    // No postexec: the next prompt closes the region without a status.
    draw_prompt(&mut host, &mut out);

    assert_eq!(codes(&decode_markers(&out)), vec!["A", "B", "C", "D", "A", "B"]);
}

// ============================================================================
// Disabling
// ============================================================================

#[test]
fn test_no_prompt_mark_emits_nothing() {
    let mut host = host_with("$ ", Some("[I] "));
    let features = FeatureSet::parse("no-cursor no-prompt-mark");
    assert_eq!(install(&mut host, Some(&features)), InstallOutcome::Disabled);

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    run_command(&mut host, "ls", 0, &mut out);

    assert!(decode_markers(&out).is_empty());
    assert_eq!(out, b"[I] $ command output\n");
    assert_eq!(
        host.hooks.get(PRIMARY_PROMPT).map(|d| d.origin),
        Some(HookOrigin::User)
    );
    assert!(host.settings.handle_reflow);
}

#[test]
fn test_missing_signal_emits_nothing() {
    let mut env: HashMap<String, String> = HashMap::new();
    let features = FeatureSet::from_env(&mut env);
    let mut host = host_with("$ ", None);
    assert_eq!(install(&mut host, features.as_ref()), InstallOutcome::Disabled);
    assert_eq!(host.subscriber_count(EventKind::Prompt), 0);
}

#[test]
fn test_signal_is_consumed_on_install() {
    let mut env = HashMap::from([(INTEGRATION_ENV.to_string(), String::new())]);
    let mut host = host_with("$ ", None);
    let features = FeatureSet::from_env(&mut env);
    assert_eq!(install(&mut host, features.as_ref()), InstallOutcome::Pending);
    assert!(!env.contains_key(INTEGRATION_ENV));
}

// ============================================================================
// Installation
// ============================================================================

#[test]
fn test_install_twice_does_not_double_emit() {
    let mut host = host_with("$ ", None);
    assert_eq!(install(&mut host, enabled().as_ref()), InstallOutcome::Pending);
    assert_eq!(
        install(&mut host, enabled().as_ref()),
        InstallOutcome::AlreadyInstalled
    );

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    assert_eq!(
        install(&mut host, enabled().as_ref()),
        InstallOutcome::AlreadyInstalled
    );
    run_command(&mut host, "ls", 0, &mut out);

    assert_eq!(codes(&decode_markers(&out)), vec!["A", "B", "C", "D;0"]);
    assert_eq!(host.subscriber_count(EventKind::PreExec), 1);
    assert_eq!(host.subscriber_count(EventKind::PostExec), 1);
}

#[test]
fn test_installer_removes_itself() {
    let mut host = host_with("$ ", None);
    install(&mut host, enabled().as_ref());
    assert!(host.install_pending());
    assert_eq!(host.hooks.get(PRIMARY_PROMPT).map(|d| d.origin), Some(HookOrigin::User));
    assert_eq!(host.subscriber_count(EventKind::Prompt), 1);
    assert_eq!(install(&mut host, enabled().as_ref()), InstallOutcome::AlreadyInstalled);
    assert_eq!(host.subscriber_count(EventKind::Prompt), 1);

    host.fire_prompt(&mut Vec::new()).unwrap();

    assert!(!host.install_pending());
    assert_eq!(host.subscriber_count(EventKind::Prompt), 0);
    assert!(!host.settings.handle_reflow);
}

#[test]
fn test_user_prompt_defined_after_install_is_captured() {
    let mut host = ShellHost::new();
    install(&mut host, enabled().as_ref());
    host.hooks.define(
        PRIMARY_PROMPT,
        HookDefinition::user("late> ", |out: &mut dyn Write| {
            out.write_all(b"late> ")?;
            Ok(())
        }),
    );

    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    assert_eq!(out, b"\x1b]133;A\x07late> \x1b]133;B\x07");
}

#[test]
fn test_missing_primary_prompt_still_marks() {
    let mut host = ShellHost::new();
    install(&mut host, enabled().as_ref());
    let mut out = Vec::new();
    draw_prompt(&mut host, &mut out);
    assert_eq!(codes(&decode_markers(&out)), vec!["A", "B"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_user_renderer_error_propagates_verbatim() {
    let mut host = ShellHost::new();
    host.hooks.define(
        PRIMARY_PROMPT,
        HookDefinition::user("broken", |_: &mut dyn Write| {
            anyhow::bail!("fish_prompt: unknown command 'gti'")
        }),
    );
    install(&mut host, enabled().as_ref());

    let mut out = Vec::new();
    host.fire_prompt(&mut out).unwrap();
    let err = host.render_primary_prompt(&mut out).unwrap_err();
    assert_eq!(err.to_string(), "fish_prompt: unknown command 'gti'");

    // The prompt start went out; the secondary prompt did not.
    assert_eq!(codes(&decode_markers(&out)), vec!["A"]);
}

#[test]
fn test_broken_output_never_fails() {
    struct Closed;
    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    let primary = UserRenderer::new(PRIMARY_PROMPT, |_| Ok(()));
    let mut sm = PromptStateMachine::new(MarkerEmitter::new(), primary, None);
    let mut out = Closed;
    sm.on_primary_render(&mut out).unwrap();
    sm.on_preexec(&mut out);
    sm.on_postexec(0, &mut out);
    assert_eq!(sm.state(), LifecycleState::PostExec);
}

// ============================================================================
// State tracking
// ============================================================================

#[test]
fn test_state_follows_events() {
    let primary = UserRenderer::new(PRIMARY_PROMPT, |_| Ok(()));
    let mode = UserRenderer::new(MODE_PROMPT, |_| Ok(()));
    let mut sm = PromptStateMachine::new(MarkerEmitter::new(), primary, Some(mode));
    let mut out = Vec::new();

    assert_eq!(sm.state(), LifecycleState::Uninitialized);
    sm.on_mode_render(&mut out).unwrap();
    assert_eq!(sm.state(), LifecycleState::PromptStart);
    sm.on_primary_render(&mut out).unwrap();
    assert_eq!(sm.state(), LifecycleState::PromptEnd);
    sm.on_preexec(&mut out);
    assert_eq!(sm.state(), LifecycleState::PreExec);
    sm.on_postexec(2, &mut out);
    assert_eq!(sm.state(), LifecycleState::PostExec);
    assert!(sm.has_mode_renderer());
}
