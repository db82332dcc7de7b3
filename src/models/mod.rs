pub mod device;
pub mod session;

pub use device::{CustomOverride, DeviceType, IntensityLevel, UnknownVariant};
pub use session::SessionRecord;
