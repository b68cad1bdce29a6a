pub mod agent;
pub mod channels;
pub mod commands;
pub mod rig;
pub mod transport;
pub mod utils;
