//! Negative errno values reported by the radio and sensor drivers

pub const EIO: i32 = -5;
pub const EAGAIN: i32 = -11;
pub const ENOMEM: i32 = -12;
pub const EINVAL: i32 = -22;
pub const EALREADY: i32 = -120;
pub const ENOTSUP: i32 = -134;
