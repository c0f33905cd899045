pub mod buffer;
pub mod device;
