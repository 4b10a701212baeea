//! Keymaker Core Library
//!
//! Gesture and timing interaction engine for the Keymaker scroll narrative.
//! Detectors turn scroll and pointer streams into discrete signals: scroll
//! velocity, stillness on two channels, a speed-gated drag onto a target,
//! and a durable completion flag. Time and input are driven by the host
//! through a [`Scheduler`] and an [`InputHub`].

mod callback;

pub mod animation;
pub mod completion;
pub mod config;
pub mod drag;
pub mod element;
pub mod idle;
pub mod input;
pub mod scheduler;
pub mod storage;
pub mod timing;
pub mod velocity;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::{Easing, Tween};
pub use completion::{COMPLETION_KEY, CompletionFlag};
pub use config::{ConfigError, DragConfig, EngineConfig, IdleConfig, VelocityConfig};
pub use drag::{DragPhase, ResistantDragController};
pub use element::{ElementHandle, HeadlessElement, Transform};
pub use idle::{IdleChannel, IdleDetector, IdleState};
pub use input::{ElementId, InputHub, PointerEvent, PointerKind, ScrollEvent, Subscription};
pub use scheduler::{CancelToken, Scheduler};
pub use storage::{KeyValueStore, MemoryStore, StoreError, create_default_store};
pub use timing::{Clock, SystemClock, Timestamp};
pub use velocity::{ScrollPace, VelocityTracker};
