pub mod decode;
pub mod photo;
