use serde::Serialize;

/// State behind a list view.
///
/// Starts out loading, as a freshly mounted view is about to fetch. Once a
/// fetch settles, `error` is set on failure and `items` holds the result on
/// success (possibly empty).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

impl<T> FetchState<T> {
    pub fn is_settled(&self) -> bool {
        !self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// State behind a create action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateState {
    pub loading: bool,
    pub error: Option<String>,
    pub success: bool,
}

/// What happens to already loaded items when a fetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorItemsPolicy {
    /// Reset the list to empty.
    #[default]
    Clear,
    /// Keep showing the last good list next to the error.
    Preserve,
}
