//! Client-side ad selection.
//!
//! The backend returns a page of candidate ads; the client filters them by
//! their serving window and picks one by weighted random draw.

pub mod selection;

pub use selection::{pick_ad, pick_weighted_ad};
