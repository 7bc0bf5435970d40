pub mod resolver;
pub mod value;

pub use resolver::{LabelResolver, Resolution};
pub use value::{LabelSet, LabelValue};
