mod index;
mod upload;

pub use index::index;
pub use upload::upload;
