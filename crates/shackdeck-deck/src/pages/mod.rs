mod generic;
mod preset;
mod rotator;

pub use generic::GenericPage;
pub use preset::PresetPage;
pub use rotator::RotatorControlPage;
