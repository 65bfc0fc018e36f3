pub use arena::*;
pub use error::*;
pub use red_black_tree::*;
pub use tree::*;
pub use utils::*;

pub mod arena;
pub mod error;
pub mod red_black_tree;
pub mod tree;
pub mod utils;
