pub mod abz;
pub mod pins;
pub mod qei;
pub mod qeo;
pub mod speed;
pub mod static_position;
