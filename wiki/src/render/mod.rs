pub mod html;
pub mod plain;

pub use html::to_html;
pub use plain::to_plain_text;
