use std::collections::HashSet;

use tracing::debug;

use crate::types::{LoadResult, ProfileCollection, StateView, UserProfile};

/// Outbound port that asks for statuses of the given users.
///
/// The call is one-way: implementations queue or send the request and return
/// immediately, and the loader never learns how the fetch went.
pub trait StatusFetchPort {
    fn fetch_statuses_by_ids(&self, user_ids: Vec<String>);
}

/// Computes which users need a fresh status and forwards them to the fetch port.
#[derive(Debug, Clone)]
pub struct StatusLoader<P> {
    port: P,
}

impl<P: StatusFetchPort> StatusLoader<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Loads statuses for visible post authors, shown direct-message partners
    /// and the current user.
    pub fn load_statuses_for_channel_and_sidebar(&self, view: &StateView) -> LoadResult {
        let mut ids = OrderedIds::default();

        if let Some(posts) = view.posts_in_channel.as_deref() {
            let visible = view.visible_post_count().min(posts.len());
            for post in &posts[..visible] {
                if !post.user_id.is_empty() {
                    ids.insert(&post.user_id);
                }
            }
        }

        for preference in &view.direct_show_preferences {
            if preference.is_enabled() {
                ids.insert(&preference.name);
            }
        }

        ids.insert(&view.current_user_id);

        self.load_statuses_by_ids(view, ids.into_vec());
        LoadResult::DISPATCHED
    }

    /// Loads statuses for every profile in order; `None` is a no-op.
    pub fn load_statuses_for_profiles_list(
        &self,
        view: &StateView,
        users: Option<&[UserProfile]>,
    ) -> LoadResult {
        let Some(users) = users else {
            return LoadResult::SKIPPED;
        };

        let ids = users.iter().map(|user| user.id.clone()).collect();
        self.load_statuses_by_ids(view, ids);
        LoadResult::DISPATCHED
    }

    /// Loads statuses for a keyed or listed profile collection; `None` is a no-op.
    pub fn load_statuses_for_profiles_map(
        &self,
        view: &StateView,
        users: Option<&ProfileCollection>,
    ) -> LoadResult {
        let Some(users) = users else {
            return LoadResult::SKIPPED;
        };

        self.load_statuses_by_ids(view, users.user_ids());
        LoadResult::DISPATCHED
    }

    /// Loads statuses only for profiles without a known status.
    pub fn load_profiles_missing_status(
        &self,
        view: &StateView,
        users: &[UserProfile],
    ) -> LoadResult {
        let missing: Vec<String> = users
            .iter()
            .filter(|user| !view.has_status(&user.id))
            .map(|user| user.id.clone())
            .collect();

        self.load_statuses_by_ids(view, missing)
    }

    /// Sends `user_ids` to the fetch port unless the list is empty or the
    /// status feature is disabled.
    pub fn load_statuses_by_ids(&self, view: &StateView, user_ids: Vec<String>) -> LoadResult {
        if user_ids.is_empty() {
            debug!(stage = "loader", reason = "empty", "status fetch skipped");
            return LoadResult::SKIPPED;
        }
        if !view.status_feature_enabled {
            debug!(
                stage = "loader",
                reason = "feature_disabled",
                count = user_ids.len(),
                "status fetch skipped"
            );
            return LoadResult::SKIPPED;
        }

        debug!(stage = "loader", count = user_ids.len(), "dispatching status fetch");
        self.port.fetch_statuses_by_ids(user_ids);
        LoadResult::DISPATCHED
    }
}

/// Insertion-ordered set of user ids.
#[derive(Default)]
struct OrderedIds {
    seen: HashSet<String>,
    ids: Vec<String>,
}

impl OrderedIds {
    fn insert(&mut self, id: &str) {
        if self.seen.insert(id.to_string()) {
            self.ids.push(id.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Post, Preference, UserStatus};
    use std::{cell::RefCell, collections::BTreeMap};

    #[derive(Default)]
    struct RecordingPort {
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl StatusFetchPort for RecordingPort {
        fn fetch_statuses_by_ids(&self, user_ids: Vec<String>) {
            self.calls.borrow_mut().push(user_ids);
        }
    }

    impl RecordingPort {
        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    fn enabled_view() -> StateView {
        StateView {
            status_feature_enabled: true,
            ..StateView::default()
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn post(user_id: &str) -> Post {
        Post {
            id: format!("post-{user_id}"),
            user_id: user_id.to_string(),
        }
    }

    fn status(user_id: &str, value: &str) -> UserStatus {
        UserStatus {
            user_id: user_id.to_string(),
            status: value.to_string(),
            manual: false,
            last_activity_at: 0,
        }
    }

    #[test]
    fn by_ids_skips_empty_list() {
        let loader = StatusLoader::new(RecordingPort::default());
        let result = loader.load_statuses_by_ids(&enabled_view(), Vec::new());
        assert_eq!(result, LoadResult::SKIPPED);
        assert!(loader.port().calls().is_empty());
    }

    #[test]
    fn by_ids_skips_when_feature_disabled() {
        let loader = StatusLoader::new(RecordingPort::default());
        let result = loader.load_statuses_by_ids(&StateView::default(), ids(&["u1"]));
        assert_eq!(result, LoadResult::SKIPPED);
        assert!(loader.port().calls().is_empty());
    }

    #[test]
    fn by_ids_dispatches_once_when_enabled() {
        let loader = StatusLoader::new(RecordingPort::default());
        let result = loader.load_statuses_by_ids(&enabled_view(), ids(&["u1"]));
        assert_eq!(result, LoadResult::DISPATCHED);
        assert_eq!(loader.port().calls(), vec![ids(&["u1"])]);
    }

    #[test]
    fn profiles_list_absent_is_noop() {
        let loader = StatusLoader::new(RecordingPort::default());
        let result = loader.load_statuses_for_profiles_list(&enabled_view(), None);
        assert_eq!(result, LoadResult::SKIPPED);
        assert!(loader.port().calls().is_empty());
    }

    #[test]
    fn profiles_list_preserves_order_and_duplicates() {
        let loader = StatusLoader::new(RecordingPort::default());
        let users = vec![
            UserProfile::new("a"),
            UserProfile::new("b"),
            UserProfile::new("a"),
        ];
        let result =
            loader.load_statuses_for_profiles_list(&enabled_view(), Some(users.as_slice()));
        assert_eq!(result, LoadResult::DISPATCHED);
        assert_eq!(loader.port().calls(), vec![ids(&["a", "b", "a"])]);
    }

    #[test]
    fn profiles_list_reports_true_even_when_primitive_skips() {
        let loader = StatusLoader::new(RecordingPort::default());
        let users = vec![UserProfile::new("a")];
        let result =
            loader.load_statuses_for_profiles_list(&StateView::default(), Some(users.as_slice()));
        assert_eq!(result, LoadResult::DISPATCHED);
        assert!(loader.port().calls().is_empty());

        let result = loader.load_statuses_for_profiles_list(&enabled_view(), Some(&[][..]));
        assert_eq!(result, LoadResult::DISPATCHED);
        assert!(loader.port().calls().is_empty());
    }

    #[test]
    fn profiles_map_uses_keys() {
        let loader = StatusLoader::new(RecordingPort::default());
        let mut keyed = BTreeMap::new();
        keyed.insert("b".to_string(), UserProfile::new("b"));
        keyed.insert("a".to_string(), UserProfile::new("a"));
        let users = ProfileCollection::KeyedById(keyed);

        let result = loader.load_statuses_for_profiles_map(&enabled_view(), Some(&users));
        assert_eq!(result, LoadResult::DISPATCHED);
        assert_eq!(loader.port().calls(), vec![ids(&["a", "b"])]);
    }

    #[test]
    fn profiles_map_with_list_uses_profile_ids() {
        let loader = StatusLoader::new(RecordingPort::default());
        let users =
            ProfileCollection::OrderedList(vec![UserProfile::new("x"), UserProfile::new("y")]);

        loader.load_statuses_for_profiles_map(&enabled_view(), Some(&users));
        assert_eq!(loader.port().calls(), vec![ids(&["x", "y"])]);
    }

    #[test]
    fn profiles_map_absent_is_noop() {
        let loader = StatusLoader::new(RecordingPort::default());
        let result = loader.load_statuses_for_profiles_map(&enabled_view(), None);
        assert_eq!(result, LoadResult::SKIPPED);
        assert!(loader.port().calls().is_empty());
    }

    #[test]
    fn missing_status_filters_known_users() {
        let loader = StatusLoader::new(RecordingPort::default());
        let mut view = enabled_view();
        view.current_status_map
            .insert("a".to_string(), status("a", "online"));
        let users = vec![UserProfile::new("a"), UserProfile::new("b")];

        let result = loader.load_profiles_missing_status(&view, &users);
        assert_eq!(result, LoadResult::DISPATCHED);
        assert_eq!(loader.port().calls(), vec![ids(&["b"])]);
    }

    #[test]
    fn missing_status_skips_when_all_known_or_disabled() {
        let loader = StatusLoader::new(RecordingPort::default());
        let mut view = enabled_view();
        view.current_status_map
            .insert("a".to_string(), status("a", "dnd"));
        let users = vec![UserProfile::new("a")];
        assert_eq!(
            loader.load_profiles_missing_status(&view, &users),
            LoadResult::SKIPPED
        );

        view.status_feature_enabled = false;
        let users = vec![UserProfile::new("b")];
        assert_eq!(
            loader.load_profiles_missing_status(&view, &users),
            LoadResult::SKIPPED
        );
        assert!(loader.port().calls().is_empty());
    }

    #[test]
    fn missing_status_treats_empty_status_as_missing() {
        let loader = StatusLoader::new(RecordingPort::default());
        let mut view = enabled_view();
        view.current_status_map.insert("a".to_string(), status("a", ""));

        loader.load_profiles_missing_status(&view, &[UserProfile::new("a")]);
        assert_eq!(loader.port().calls(), vec![ids(&["a"])]);
    }

    #[test]
    fn channel_and_sidebar_collects_visible_authors_partners_and_self() {
        let loader = StatusLoader::new(RecordingPort::default());
        let mut view = enabled_view();
        view.channel_id = "c-1".to_string();
        view.posts_in_channel = Some(vec![post("x"), post("y"), post("z")]);
        view.post_visibility.insert("c-1".to_string(), 2);
        view.direct_show_preferences = vec![
            Preference::direct_show("w", true),
            Preference::direct_show("hidden", false),
        ];
        view.current_user_id = "u".to_string();

        let result = loader.load_statuses_for_channel_and_sidebar(&view);
        assert_eq!(result, LoadResult::DISPATCHED);

        let calls = loader.port().calls();
        assert_eq!(calls.len(), 1);
        let dispatched: HashSet<_> = calls[0].iter().cloned().collect();
        let expected: HashSet<_> = ids(&["x", "y", "w", "u"]).into_iter().collect();
        assert_eq!(dispatched, expected);
        assert_eq!(calls[0].len(), 4);
    }

    #[test]
    fn channel_and_sidebar_deduplicates_and_skips_authorless_posts() {
        let loader = StatusLoader::new(RecordingPort::default());
        let mut view = enabled_view();
        view.channel_id = "c-1".to_string();
        view.posts_in_channel = Some(vec![post("u"), post(""), post("x"), post("x")]);
        view.post_visibility.insert("c-1".to_string(), 10);
        view.direct_show_preferences = vec![Preference::direct_show("x", true)];
        view.current_user_id = "u".to_string();

        loader.load_statuses_for_channel_and_sidebar(&view);
        assert_eq!(loader.port().calls(), vec![ids(&["u", "x"])]);
    }

    #[test]
    fn channel_and_sidebar_without_visibility_only_loads_sidebar() {
        let loader = StatusLoader::new(RecordingPort::default());
        let mut view = enabled_view();
        view.channel_id = "c-1".to_string();
        view.posts_in_channel = Some(vec![post("x")]);
        view.current_user_id = "u".to_string();

        loader.load_statuses_for_channel_and_sidebar(&view);
        assert_eq!(loader.port().calls(), vec![ids(&["u"])]);
    }

    #[test]
    fn channel_and_sidebar_returns_true_when_feature_disabled() {
        let loader = StatusLoader::new(RecordingPort::default());
        let view = StateView {
            current_user_id: "u".to_string(),
            ..StateView::default()
        };

        let result = loader.load_statuses_for_channel_and_sidebar(&view);
        assert_eq!(result, LoadResult::DISPATCHED);
        assert!(loader.port().calls().is_empty());
    }

    #[test]
    fn channel_and_sidebar_without_posts_loads_current_user() {
        let loader = StatusLoader::new(RecordingPort::default());
        let mut view = enabled_view();
        view.channel_id = "c-1".to_string();
        view.posts_in_channel = None;
        view.post_visibility.insert("c-1".to_string(), 5);
        view.current_user_id = "u".to_string();

        let result = loader.load_statuses_for_channel_and_sidebar(&view);
        assert_eq!(result, LoadResult::DISPATCHED);
        assert_eq!(loader.port().calls(), vec![ids(&["u"])]);
    }

    #[test]
    fn profiles_map_reports_true_without_dispatch_when_feature_disabled() {
        let loader = StatusLoader::new(RecordingPort::default());
        let users = ProfileCollection::OrderedList(vec![UserProfile::new("x")]);

        let result = loader.load_statuses_for_profiles_map(&StateView::default(), Some(&users));
        assert_eq!(result, LoadResult::DISPATCHED);
        assert!(loader.port().calls().is_empty());
    }

    #[test]
    fn repeated_calls_dispatch_again() {
        let loader = StatusLoader::new(RecordingPort::default());
        let view = enabled_view();
        let users = vec![UserProfile::new("a")];

        loader.load_statuses_for_profiles_list(&view, Some(users.as_slice()));
        loader.load_statuses_for_profiles_list(&view, Some(users.as_slice()));
        assert_eq!(loader.port().calls(), vec![ids(&["a"]), ids(&["a"])]);
    }
}
