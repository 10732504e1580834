/// Current page of a session, clamped to the document's page range.
///
/// Until the renderer reports a page count the document is treated as a
/// single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    current: u32,
    total: Option<u32>,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self { current: 1, total: None }
    }
}

impl PageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total(&self) -> Option<u32> {
        self.total
    }

    pub fn last_page(&self) -> u32 {
        self.total.unwrap_or(1).max(1)
    }

    pub fn set_total(&mut self, total: u32) {
        self.total = Some(total.max(1));
        self.current = self.current.min(self.last_page());
    }

    pub fn next(&mut self) -> u32 {
        self.current = self.current.saturating_add(1).min(self.last_page());
        self.current
    }

    pub fn previous(&mut self) -> u32 {
        self.current = self.current.saturating_sub(1).max(1);
        self.current
    }

    pub fn go_to(&mut self, page: u32) -> u32 {
        self.current = page.max(1).min(self.last_page());
        self.current
    }

    pub fn is_first(&self) -> bool {
        self.current == 1
    }

    pub fn is_last(&self) -> bool {
        self.current == self.last_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_is_clamped_at_first_page() {
        let mut cursor = PageCursor::new();
        cursor.set_total(4);
        for _ in 0..10 {
            cursor.previous();
        }
        assert_eq!(cursor.current(), 1);
        assert!(cursor.is_first());
    }

    #[test]
    fn next_is_clamped_to_document_bounds() {
        let mut cursor = PageCursor::new();
        cursor.set_total(2);
        cursor.next();
        cursor.next();
        cursor.next();
        assert_eq!(cursor.current(), 2);
        assert!(cursor.is_last());
    }

    #[test]
    fn unknown_page_count_behaves_like_single_page() {
        let mut cursor = PageCursor::new();
        assert_eq!(cursor.next(), 1);
        assert_eq!(cursor.go_to(9), 1);
    }

    #[test]
    fn shrinking_page_count_pulls_cursor_back() {
        let mut cursor = PageCursor::new();
        cursor.set_total(10);
        cursor.go_to(8);
        cursor.set_total(3);
        assert_eq!(cursor.current(), 3);
        assert_eq!(cursor.go_to(0), 1);
    }
}
