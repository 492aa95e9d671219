//! Pointer interaction: hit testing, the drag state machine and the
//! notifications it emits.

pub mod callbacks;
pub mod drag;
pub mod hit;

pub use callbacks::{InteractionCallbacks, InteractionEvent, RecordingCallbacks};
pub use drag::{
    preview_dates, DateCommit, DateDrag, DragController, DragMode, DragOutcome, DragState,
    LinkDrag, LinkRequest,
};
pub use hit::{Anchor, BarRegion, Hit, HitZones};
