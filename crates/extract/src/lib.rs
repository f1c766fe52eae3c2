pub mod entities;
pub mod normalizer;
pub mod parser;
pub mod repair;
pub mod scanner;
pub mod schema;

pub use entities::EntityMap;
pub use normalizer::{normalize_dialog, normalize_name};
pub use parser::{extract_json, parse_character_list, parse_dialog_list, parse_entities};
pub use schema::{DialogAttribution, EntityRecord, VoiceProfile};
