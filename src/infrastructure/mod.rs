pub mod bluetooth;
pub mod errno;
pub mod log_backend;
pub mod logging;
pub mod sensor;
