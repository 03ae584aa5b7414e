pub mod api_client;
pub mod models;
pub mod utils;

pub use api_client::FileApi;
pub use models::{FileInfo, PageParams};
pub use utils::format_file_size;
