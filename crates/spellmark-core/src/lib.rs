//! spellmark-core: spell-error annotation reconciliation without framework dependencies.
//!
//! This crate provides:
//! - `TextBuffer` trait for char-indexed storage, `EditorRope` ropey-backed implementation
//! - `EditingSurface` capability trait and `AnnotatedDocument<T>` reference surface
//! - `SuppressionStore`, `SpanRegistry`, `resolve` - the pieces a reconciliation pass is built from
//! - `Reconciler` - brings highlighted spans back into agreement with the active error set
//! - `SelectionMachine`, `ResolutionAction` - the suggestion menu and what it can do
//! - `FetchScheduler`, `SpellCheckService` - debounced, cancellable checking
//! - `SpellSession<S>` - the single actor composing all of the above

pub mod actions;
pub mod config;
pub mod reconciler;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod selection;
pub mod service;
pub mod session;
pub mod suppression;
pub mod surface;
pub mod text;
pub mod types;

pub use actions::{ActionOutcome, ResolutionAction};
pub use config::{ConfigError, EngineConfig};
pub use reconciler::{PassReport, Reconciler};
pub use registry::{SpanEntry, SpanRegistry};
pub use resolver::{Resolution, resolve};
pub use scheduler::{FetchRequest, FetchScheduler, FetchTicket};
pub use selection::{MenuView, SelectionEvent, SelectionMachine, SelectionState, Transition};
pub use service::{CheckError, CheckOutcome, HttpSpellChecker, SpellCheckService, decode_response};
pub use session::{ClickEvent, Effect, SessionEvent, SpellSession};
pub use smol_str::SmolStr;
pub use suppression::SuppressionStore;
pub use surface::{AnnotatedDocument, Annotation, AnnotationHandle, EditingSurface, SurfaceError};
pub use text::{EditorRope, TextBuffer, find_occurrences};
pub use types::{AnchorPoint, DetectedError, HighlightedSpan, Language, SpanId};
