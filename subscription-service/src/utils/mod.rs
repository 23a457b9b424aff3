mod identifier;

pub use identifier::{is_valid_identifier, parse_identifier};
