pub mod http;

use crate::document::ReportDocument;
use anyhow::Result;

pub use http::HttpRenderer;

/// Turns a report document into PDF bytes.
pub trait Renderer {
    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>>;
}
