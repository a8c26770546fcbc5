//! The conversation state machine: orchestrates story advancement,
//! receipt upgrades, and view/deferred-queue management atop the typed
//! primitives in `convo-core`.

pub mod context;
pub mod diagnostics;
pub mod effects;
pub mod error;
pub mod events;
pub mod machine;
pub mod options;
pub mod receipt;
pub mod states;
pub mod story;
pub mod view;

pub use context::{ConversationContext, CurrentView, ReceiptChangedSignal};
pub use diagnostics::{Diagnostic, DiagnosticLog};
pub use effects::Effect;
pub use error::TransitionError;
pub use events::{ConversationEvent, DeferredEntry};
pub use machine::{ConversationMachine, StateTransition};
pub use options::RuntimeOptions;
pub use states::ConversationState;
pub use story::{Choice, Chunk, Story};
