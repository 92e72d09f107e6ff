pub mod bookmark;
pub mod location;
pub mod user_state;

pub use bookmark::{Bookmark, CheckPeriod};
pub use location::{RootLocations, SiteLocation};
pub use user_state::WizardState;
