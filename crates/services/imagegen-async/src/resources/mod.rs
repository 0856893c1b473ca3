/// Image generation and endpoint health
pub mod images;

pub use images::Images;
