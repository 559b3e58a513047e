//! Core domain types shared across the crate.

pub mod error;
pub mod station;

pub use error::{ChannelError, SourceError, StoreError};
pub use station::{
    Coordinates, Rating, Station, StationSource, StationType, FAST_CHARGING_KW,
    MIN_CHARGING_SPEED_KW, SUPER_FAST_KW,
};
