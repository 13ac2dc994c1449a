pub mod emitter;
pub mod error;
pub mod features;
pub mod hooks;
pub mod integration;
pub mod lifecycle;
pub mod marker;
pub mod state_machine;
pub mod term;

pub use emitter::MarkerEmitter;
pub use error::IntegrationError;
pub use features::{EnvStore, FeatureSet, ProcessEnv};
pub use hooks::{HookDefinition, HookTable, UserRenderer, MODE_PROMPT, PRIMARY_PROMPT};
pub use integration::{install, InstallOutcome};
pub use lifecycle::{Disposition, EventKind, LifecycleEvent, ShellHost};
pub use marker::{Marker, MarkerKind};
pub use state_machine::{LifecycleState, PromptEvent, PromptStateMachine};
