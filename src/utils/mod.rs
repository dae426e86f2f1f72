pub mod constants;
pub mod path_utils;
pub mod url_utils;

pub use constants::*;
pub use path_utils::{decode_output_path, relativize, split_extension, with_suffix};
pub use url_utils::{is_valid_url, path_from_url};
