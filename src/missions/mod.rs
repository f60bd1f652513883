pub mod combat;
pub mod data;
pub mod expansion;
pub mod missionsystem;
pub mod script;
