//! Core trim engine: duration discovery, range state, selector and bounded playback

pub mod duration;
pub mod events;
pub mod playback;
pub mod range;
pub mod selector;

pub use duration::{DurationCell, DurationResolver, ResolverSettings};
pub use events::{ListenerRegistry, PlaybackEvent, PlaybackListener, Subscription};
pub use playback::{BoundedPlaybackController, PlaybackSettings, TimeDisplay};
pub use range::{RangeCell, RangeModel};
pub use selector::{
    synthetic_waveform, Pointer, RangeSelector, SelectorAction, TrackFrame, TrackGeometry,
    TrackView, HIT_PRECEDENCE,
};
