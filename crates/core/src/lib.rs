pub mod loader;
pub mod types;

pub use loader::{StatusFetchPort, StatusLoader};
pub use types::{
    LoadResult, Post, Preference, ProfileCollection, StateView, StatusMap, UserProfile,
    UserStatus,
};
