pub mod story;

pub use story::{Character, Panel, StoryContext};
