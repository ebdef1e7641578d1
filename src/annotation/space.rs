//! Coordinate space markers.
//!
//! Zero-sized types used as type parameters so that pixel boxes read from
//! annotation files cannot be written into a record without being
//! normalized first.

use std::fmt;

/// Marker for absolute pixel coordinates, as stored in annotation files.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker for coordinates divided by the image width/height.
///
/// Values are expected in `[0, 1]` but this is not enforced.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
