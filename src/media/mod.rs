//! Media file tag handling

pub mod reader;
pub mod tags;

pub use reader::LoftyTagReader;
pub use tags::Tags;
