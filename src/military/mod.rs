pub mod awareness;
pub mod micro;
pub mod sectors;
pub mod spatial;
pub mod squad;
pub mod threatmap;
