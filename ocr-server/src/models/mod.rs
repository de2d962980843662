mod ocr;
mod upload;

pub use ocr::*;
pub use upload::*;
