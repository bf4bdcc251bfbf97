pub mod open;
pub mod serve;
