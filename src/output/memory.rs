use crate::crawler::PageResult;
use crate::output::traits::{OutputResult, PageSink};

/// Keeps page results in memory
///
/// Used when the caller wants the results themselves rather than a file.
#[derive(Debug, Default)]
pub struct MemorySink {
    pages: Vec<PageResult>,
}

impl MemorySink {
    pub fn pages(&self) -> &[PageResult] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<PageResult> {
        self.pages
    }
}

impl PageSink for MemorySink {
    fn write(&mut self, page: &PageResult) -> OutputResult<()> {
        self.pages.push(page.clone());
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
