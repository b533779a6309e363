pub mod enums;
pub mod image_unit;
pub mod result_record;

pub use enums::*;
pub use image_unit::*;
pub use result_record::*;
