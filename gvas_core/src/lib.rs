pub mod catalog;
pub mod error;
pub mod format;
pub mod key;
pub mod matcher;
pub mod save;

pub use catalog::Catalog;
pub use error::{CatalogError, ScanError};
pub use format::{decode_count, is_valid_header, read_f32_le, KEY_LEN, MAGIC};
pub use key::{KeyParseError, MarkerKey};
pub use matcher::{locate, Matcher};
pub use save::{count_or_zero, read_save, Hits, SaveFile};
