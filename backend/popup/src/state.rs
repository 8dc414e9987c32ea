/// State the popup renders from.
///
/// `pending_image` and `pending_error` are never both set; every mutator
/// below clears one when it sets the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pending_image: Option<String>,
    pending_error: Option<String>,
    pub frame_identifier: String,
}

/// What the popup currently shows below its controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View<'a> {
    /// Nothing captured yet, or a request is in flight
    Idle,
    Image(&'a str),
    Error(&'a str),
}

impl UiState {
    /// Empty state with the frame field pre-filled.
    pub fn with_frame_identifier(frame_identifier: impl Into<String>) -> Self {
        Self {
            frame_identifier: frame_identifier.into(),
            ..Default::default()
        }
    }

    pub fn pending_image(&self) -> Option<&str> {
        self.pending_image.as_deref()
    }

    pub fn pending_error(&self) -> Option<&str> {
        self.pending_error.as_deref()
    }

    pub(crate) fn clear_outcome(&mut self) {
        self.pending_image = None;
        self.pending_error = None;
    }

    pub(crate) fn show_image(&mut self, data_url: &str) {
        self.pending_image = Some(data_url.to_string());
        self.pending_error = None;
    }

    pub(crate) fn show_error(&mut self, message: &str) {
        self.pending_error = Some(message.to_string());
        self.pending_image = None;
    }

    pub fn view(&self) -> View<'_> {
        match (&self.pending_error, &self.pending_image) {
            (Some(error), _) => View::Error(error),
            (None, Some(image)) => View::Image(image),
            (None, None) => View::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_replaces_error() {
        let mut state = UiState::default();
        state.show_error("boom");
        state.show_image("data:x");
        assert_eq!(state.pending_error(), None);
        assert_eq!(state.view(), View::Image("data:x"));
    }

    #[test]
    fn test_error_replaces_image() {
        let mut state = UiState::default();
        state.show_image("data:x");
        state.show_error("boom");
        assert_eq!(state.pending_image(), None);
        assert_eq!(state.view(), View::Error("boom"));
    }

    #[test]
    fn test_with_frame_identifier_starts_idle() {
        let state = UiState::with_frame_identifier("abc/1:2");
        assert_eq!(state.frame_identifier, "abc/1:2");
        assert_eq!(state.pending_image(), None);
        assert_eq!(state.pending_error(), None);
        assert_eq!(state.view(), View::Idle);
    }

    #[test]
    fn test_clear_keeps_frame_identifier() {
        let mut state = UiState::with_frame_identifier("abc/1:2");
        state.show_image("data:x");
        state.clear_outcome();
        assert_eq!(state.view(), View::Idle);
        assert_eq!(state.frame_identifier, "abc/1:2");
    }
}
