//! Event bus, external-function bridge, and system composition: the outer
//! layer that turns `convo-state`'s pure transitions into a running
//! conversation against a concrete story implementation.

pub mod bridge;
pub mod bus;
pub mod error;
pub mod runtime;
pub mod snapshot;
pub mod tracing_init;

pub use bridge::{DataRequest, ExternalFunctionBridge, IdentityLocale, LocaleResolver, LookaheadSafety};
pub use bus::{EventBus, RuntimeEvent};
pub use error::RuntimeError;
pub use runtime::ConversationRuntime;
pub use snapshot::Snapshot;
pub use tracing_init::init_tracing;
