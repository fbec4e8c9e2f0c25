pub mod anchor;
pub mod capture;
pub mod context;
pub mod error;
pub mod generation;
pub mod insertion;
pub mod overlay;
pub mod page;
pub mod trigger;

// Re-export key types for easier usage
pub use anchor::{Anchor, MarkerId, Surface};
pub use capture::{
    EngineConfig, Key, KeyOutcome, KeyPress, Mode, Modifiers, OverlayHit, Phase, Platform,
    PointerOutcome, PointerTarget, PromptEngine, Resolution, SessionId,
};
pub use context::ContextLimits;
pub use error::DomError;
pub use generation::*;
pub use insertion::{InsertOutcome, NativeValueWriter, PropertyValueWriter, ValueWriter};
pub use overlay::{OverlayBody, OverlayView, Position, SuggestionRow};
pub use page::{NodeId, Page, Point, Rect, TextField, Viewport};
