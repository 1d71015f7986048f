//! I2C capabilities
//!
//! Both sides are initialized from a [`DataStream`](crate::DataStream).

pub mod master;
pub mod slave;
