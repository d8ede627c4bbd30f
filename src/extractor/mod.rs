pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::{MediaKind, ProducedFile};
pub use traits::Extractor;
pub use ytdlp::YtDlpExtractor;
