#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SearchEffect {
    None,
    Submit(String),
    Clear,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Escape {
    Consumed(SearchEffect),
    // Nothing to cancel; escape means "go back".
    Unhandled,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ListSearch {
    search_mode: bool,
    search_query: String,
    submitted_query: String,
}

impl ListSearch {
    pub fn with_submitted(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            search_mode: false,
            search_query: query.clone(),
            submitted_query: query,
        }
    }

    pub fn search_mode(&self) -> bool {
        self.search_mode
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn submitted_query(&self) -> &str {
        &self.submitted_query
    }

    pub fn has_submitted(&self) -> bool {
        !self.submitted_query.is_empty()
    }

    pub fn enter_search_mode(&mut self) {
        self.search_mode = true;
    }

    pub fn push_char(&mut self, c: char) {
        if self.search_mode {
            self.search_query.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.search_mode {
            self.search_query.pop();
        }
    }

    pub fn submit_search(&mut self) -> SearchEffect {
        if !self.search_mode {
            return SearchEffect::None;
        }
        self.search_mode = false;
        self.search_query = self.search_query.trim().to_string();
        if self.search_query.is_empty() {
            return if self.has_submitted() {
                self.submitted_query.clear();
                SearchEffect::Clear
            } else {
                SearchEffect::None
            };
        }
        self.submitted_query = self.search_query.clone();
        SearchEffect::Submit(self.submitted_query.clone())
    }

    pub fn cancel_search(&mut self) {
        self.search_mode = false;
        self.search_query = self.submitted_query.clone();
    }

    pub fn clear_search(&mut self) -> SearchEffect {
        self.search_mode = false;
        self.search_query.clear();
        if self.submitted_query.is_empty() {
            return SearchEffect::None;
        }
        self.submitted_query.clear();
        SearchEffect::Clear
    }

    pub fn handle_escape(&mut self) -> Escape {
        if self.search_mode {
            self.cancel_search();
            Escape::Consumed(SearchEffect::None)
        } else if self.has_submitted() {
            Escape::Consumed(self.clear_search())
        } else {
            Escape::Unhandled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Escape, ListSearch, SearchEffect};

    fn type_text(search: &mut ListSearch, text: &str) {
        for c in text.chars() {
            search.push_char(c);
        }
    }

    #[test]
    fn entering_does_not_change_submitted_query() {
        let mut search = ListSearch::with_submitted("prod");
        search.enter_search_mode();
        search.backspace();
        type_text(&mut search, "x");
        assert_eq!(search.search_query(), "prox");
        assert_eq!(search.submitted_query(), "prod");
    }

    #[test]
    fn submit_reports_query() {
        let mut search = ListSearch::default();
        search.enter_search_mode();
        type_text(&mut search, " dev ");
        assert_eq!(search.submit_search(), SearchEffect::Submit("dev".to_string()));
        assert!(!search.search_mode());
        assert_eq!(search.submitted_query(), "dev");
    }

    #[test]
    fn escape_while_entering_restores_submitted_query() {
        let mut search = ListSearch::default();
        search.enter_search_mode();
        type_text(&mut search, "one");
        search.submit_search();

        search.enter_search_mode();
        type_text(&mut search, "two");
        let escape = search.handle_escape();
        assert_eq!(escape, Escape::Consumed(SearchEffect::None));
        assert_eq!(search.search_query(), "one");
        assert_eq!(search.submitted_query(), "one");
        assert!(!search.search_mode());
    }

    #[test]
    fn escape_with_submitted_query_clears_it() {
        let mut search = ListSearch::with_submitted("one");
        assert_eq!(
            search.handle_escape(),
            Escape::Consumed(SearchEffect::Clear)
        );
        assert!(!search.has_submitted());
    }

    #[test]
    fn escape_when_idle_is_unhandled() {
        let mut search = ListSearch::default();
        assert_eq!(search.handle_escape(), Escape::Unhandled);
        assert!(!matches!(search.handle_escape(), Escape::Consumed(_)));
    }

    #[test]
    fn submitting_empty_query_clears_previous_one() {
        let mut search = ListSearch::with_submitted("one");
        search.enter_search_mode();
        for _ in 0..3 {
            search.backspace();
        }
        assert_eq!(search.submit_search(), SearchEffect::Clear);
        assert!(!search.has_submitted());
    }

    #[test]
    fn typing_outside_search_mode_is_ignored() {
        let mut search = ListSearch::default();
        type_text(&mut search, "abc");
        assert_eq!(search.search_query(), "");
    }
}
