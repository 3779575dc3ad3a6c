pub use crate::PositionSource;
pub use crate::common::abz::{
    AbzConfig, AbzGenerator, AbzSample, ConfigError, POSITION_SPAN, RangeError,
};
pub use crate::common::qei::{QeiConfig, QeiCounter, ZCountMode};
pub use crate::common::qeo::Qeo;
pub use crate::common::static_position::{PublishStaticPosition, StaticPosition};
