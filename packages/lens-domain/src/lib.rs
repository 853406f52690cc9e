pub mod candidate;
pub mod description;
pub mod entry;
pub mod intent;
pub mod scenario;
pub mod similarity;
pub mod tags;
