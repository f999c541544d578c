pub mod config_cmd;
pub mod doctor;
pub mod order;
pub mod serve;
