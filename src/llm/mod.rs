pub mod assembler;
pub mod encoder;
pub mod prompts;
pub mod response;
pub mod types;

pub use assembler::*;
pub use encoder::*;
pub use prompts::normalize_field_name;
pub use response::*;
pub use types::*;
