pub mod compare;
pub mod requester;
pub mod state;

pub use compare::UnimplementedComparison;
pub use requester::{Requester, RequesterSettings};
pub use state::{UiState, View};
