#![forbid(unsafe_code)]

//! In-page search session.
//!
//! Search delegates matching to the host's find-in-page primitive. This
//! module only tracks whether the search bar is open and which query
//! `searchNext`/`searchPrev` repeat. Mode transitions belong to the caller.

use crate::host::{FindOptions, Overlay, PageFinder};

#[derive(Debug, Default, Clone)]
pub struct SearchState {
    last_query: String,
    open: bool,
}

impl SearchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The query repeated by next/prev; `None` when empty.
    #[must_use]
    pub fn last_query(&self) -> Option<&str> {
        (!self.last_query.is_empty()).then_some(self.last_query.as_str())
    }

    /// Show the search bar. Returns false if it was already open.
    pub fn open<O: Overlay + ?Sized>(&mut self, overlay: &mut O) -> bool {
        if self.open {
            return false;
        }
        self.open = true;
        overlay.show_search_bar();
        tracing::debug!(target: "vimnav.search", "search bar opened");
        true
    }

    /// Hide the search bar. Returns whether it was open.
    pub fn close<O: Overlay + ?Sized>(&mut self, overlay: &mut O) -> bool {
        if !self.open {
            return false;
        }
        self.open = false;
        overlay.hide_search_bar();
        true
    }

    /// Commit `query`: remember it, close the bar, then search forward if
    /// it is non-empty. Returns the find result, if a find ran.
    pub fn submit<H: PageFinder + Overlay + ?Sized>(&mut self, query: &str, host: &mut H) -> Option<bool> {
        self.last_query = query.to_string();
        self.close(host);
        if query.is_empty() {
            return None;
        }
        Some(find_on_page(query, true, host))
    }

    /// Repeat the last query in the given direction.
    pub fn repeat<H: PageFinder + Overlay + ?Sized>(&self, forward: bool, host: &mut H) -> Option<bool> {
        let query = self.last_query()?;
        Some(find_on_page(query, forward, host))
    }

    /// Forget the last query and drop the selection and its highlight.
    pub fn clear<H: PageFinder + Overlay + ?Sized>(&mut self, host: &mut H) {
        self.last_query.clear();
        host.set_selection_highlight(false);
        host.clear_selection();
    }
}

/// Run one find and mirror the result in the selection highlight.
pub fn find_on_page<H: PageFinder + Overlay + ?Sized>(query: &str, forward: bool, host: &mut H) -> bool {
    let found = host.find(query, FindOptions::direction(forward));
    host.set_selection_highlight(found);
    tracing::debug!(target: "vimnav.search", query, forward, found, "find");
    found
}
