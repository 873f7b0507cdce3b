pub mod addressing;
pub mod bridge;
pub mod capture;
pub mod controller;
pub mod dom;
pub mod error;
pub mod plain_text;
pub mod range;
pub mod sim;
pub mod support;

// Re-export key types for easier usage
pub use addressing::{Path, child_from_path, path_from_child};
pub use bridge::{BridgeHooks, CompositionSession, SelectionBridge, SelectionStatus};
pub use capture::{CaptureState, MutationCapture};
pub use controller::{
    CaretFixer, Controller, ControllerState, Dispatch, EditHandler, HostEvent, InputIntent, InputKind,
    ParagraphPolicy, RenderOutcome, SurfaceOptions,
};
pub use dom::{Boundary, Document, LiveSelection, Markup, NodeId, StaticRange};
pub use error::EditError;
pub use plain_text::{PlainText, PlainTextCall};
pub use range::{InlineRange, Point, compare_points};
pub use sim::SimulatedHost;
pub use support::{Browser, HostSupport};
