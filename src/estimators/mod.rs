pub mod atmosphere;
pub mod vertical_kalman;
