#![doc = include_str!("../README.md")]

mod driver;
mod post;

pub use driver::YamlDriver;
pub use post::{LineInfo, PostProcessor, SectionWalker, YamlWalker};
