//! Chart objects as plain values.
//!
//! Objects reference each other by [`guid::Guid`]; the
//! [`crate::timeline::Timeline`] owns them all.

pub mod custom_props;
pub mod guid;
pub mod lane;
pub mod lane_point;
pub mod layer;
pub mod note;
pub mod note_line;
pub mod other_object;

pub use custom_props::{CustomPropSchema, CustomProps, CustomValue};
pub use guid::{Guid, GuidSource, SequentialGuids, UuidSource};
pub use lane::Lane;
pub use lane_point::LanePoint;
pub use layer::Layer;
pub use note::Note;
pub use note_line::{Curve, CurveType, NoteLine};
pub use other_object::{OtherObject, OtherObjectType, OtherObjectValue};
