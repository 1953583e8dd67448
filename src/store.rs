use crate::model::{ResourceKind, ResourceRecord};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

pub const MAX_CACHE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone)]
pub struct ResourceStore<T> {
    items: Vec<T>,
    loading: bool,
    initial_loading: bool,
    error: Option<String>,
    current_page: usize,
    page_size: usize,
    total_count: usize,
    has_more: bool,
    page_cache: HashMap<usize, Vec<T>>,
    last_id_cache: HashMap<usize, String>,
    more_cache: HashMap<usize, bool>,
    cache_order: VecDeque<usize>,
    search_query: String,
    selected_index: isize,
    latest_ticket: u64,
}

impl<T> Default for ResourceStore<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            initial_loading: true,
            error: None,
            current_page: 0,
            page_size: 0,
            total_count: 0,
            has_more: false,
            page_cache: HashMap::new(),
            last_id_cache: HashMap::new(),
            more_cache: HashMap::new(),
            cache_order: VecDeque::new(),
            search_query: String::new(),
            selected_index: 0,
            latest_ticket: 0,
        }
    }
}

impl<T: Clone> ResourceStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn initial_loading(&self) -> bool {
        self.initial_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn selected_index(&self) -> isize {
        self.selected_index
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_initial_loading(&mut self, initial_loading: bool) {
        self.initial_loading = initial_loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn set_current_page(&mut self, page: usize) {
        self.current_page = page;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
    }

    pub fn set_total_count(&mut self, total_count: usize) {
        self.total_count = total_count;
    }

    pub fn set_has_more(&mut self, has_more: bool) {
        self.has_more = has_more;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn set_selected_index(&mut self, index: isize) {
        self.selected_index = index;
    }

    pub fn selected(&self) -> Option<&T> {
        usize::try_from(self.selected_index)
            .ok()
            .and_then(|index| self.items.get(index))
    }

    pub fn cache_page_data(&mut self, page: usize, data: &[T], last_id: impl Into<String>) {
        if !self.page_cache.contains_key(&page)
            && self.page_cache.len() >= MAX_CACHE_SIZE
            && let Some(oldest) = self.cache_order.pop_front()
        {
            self.page_cache.remove(&oldest);
            self.last_id_cache.remove(&oldest);
            self.more_cache.remove(&oldest);
            debug!("page cache full, evicted page {oldest}");
        }

        if !self.page_cache.contains_key(&page) {
            self.cache_order.push_back(page);
        }
        self.page_cache.insert(page, data.to_vec());
        self.last_id_cache.insert(page, last_id.into());
    }

    /// `None` means "not cached", never "empty page".
    pub fn cached_page(&self, page: usize) -> Option<&[T]> {
        self.page_cache.get(&page).map(Vec::as_slice)
    }

    pub fn cached_last_id(&self, page: usize) -> Option<&str> {
        self.last_id_cache.get(&page).map(String::as_str)
    }

    pub fn cache_has_more(&mut self, page: usize, has_more: bool) {
        if self.page_cache.contains_key(&page) {
            self.more_cache.insert(page, has_more);
        }
    }

    pub fn cached_has_more(&self, page: usize) -> Option<bool> {
        self.more_cache.get(&page).copied()
    }

    pub fn cached_pages(&self) -> usize {
        self.page_cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.page_cache.clear();
        self.last_id_cache.clear();
        self.more_cache.clear();
        self.cache_order.clear();
    }

    pub fn clear_all(&mut self) {
        let latest_ticket = self.latest_ticket;
        *self = Self::default();
        self.latest_ticket = latest_ticket;
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_ticket += 1;
        self.loading = true;
        FetchTicket(self.latest_ticket)
    }

    pub fn is_latest(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.latest_ticket
    }
}

impl<T: Clone + PartialEq> PartialEq for ResourceStore<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
            && self.loading == other.loading
            && self.initial_loading == other.initial_loading
            && self.error == other.error
            && self.current_page == other.current_page
            && self.page_size == other.page_size
            && self.total_count == other.total_count
            && self.has_more == other.has_more
            && self.page_cache == other.page_cache
            && self.last_id_cache == other.last_id_cache
            && self.more_cache == other.more_cache
            && self.cache_order == other.cache_order
            && self.search_query == other.search_query
            && self.selected_index == other.selected_index
    }
}

#[derive(Debug, Clone)]
pub struct Stores {
    stores: Vec<ResourceStore<ResourceRecord>>,
}

impl Default for Stores {
    fn default() -> Self {
        Self {
            stores: ResourceKind::ALL
                .iter()
                .map(|_| ResourceStore::new())
                .collect(),
        }
    }
}

impl Stores {
    pub fn get(&self, kind: ResourceKind) -> &ResourceStore<ResourceRecord> {
        &self.stores[kind_index(kind)]
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut ResourceStore<ResourceRecord> {
        &mut self.stores[kind_index(kind)]
    }

    pub fn clear_all(&mut self, kind: ResourceKind) {
        debug!("clearing {} store", kind.title());
        self.get_mut(kind).clear_all();
    }
}

fn kind_index(kind: ResourceKind) -> usize {
    ResourceKind::ALL
        .iter()
        .position(|candidate| *candidate == kind)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{MAX_CACHE_SIZE, ResourceStore, Stores};
    use crate::model::{ResourceKind, ResourceRecord};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        tags: Vec<String>,
    }

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            tags: vec!["a".to_string()],
        }
    }

    fn page_of(prefix: &str, count: usize) -> Vec<Item> {
        (1..=count).map(|n| item(&format!("{prefix}_{n}"))).collect()
    }

    #[test]
    fn eviction_drops_first_inserted_page() {
        let mut store = ResourceStore::new();
        for page in 0..=MAX_CACHE_SIZE {
            store.cache_page_data(page, &page_of("p", 1), format!("last_{page}"));
        }
        assert_eq!(store.cached_pages(), MAX_CACHE_SIZE);
        assert!(store.cached_page(0).is_none());
        assert!(store.cached_last_id(0).is_none());
        for page in 1..=MAX_CACHE_SIZE {
            assert!(store.cached_page(page).is_some(), "page {page} missing");
        }
    }

    #[test]
    fn has_more_is_kept_and_evicted_with_its_page() {
        let mut store = ResourceStore::new();
        store.cache_has_more(0, true);
        assert_eq!(store.cached_has_more(0), None);

        store.cache_page_data(0, &page_of("p", 2), "p_2");
        store.cache_has_more(0, false);
        assert_eq!(store.cached_has_more(0), Some(false));

        for page in 1..=MAX_CACHE_SIZE {
            store.cache_page_data(page, &page_of("p", 1), "x");
        }
        assert_eq!(store.cached_has_more(0), None);
    }

    #[test]
    fn eviction_follows_insertion_not_access() {
        let mut store = ResourceStore::new();
        for page in 0..MAX_CACHE_SIZE {
            store.cache_page_data(page, &page_of("p", 1), "x");
        }
        let _ = store.cached_page(0);
        store.cache_page_data(MAX_CACHE_SIZE, &page_of("p", 1), "x");
        assert!(store.cached_page(0).is_none());
        assert!(store.cached_page(1).is_some());
    }

    #[test]
    fn recaching_a_page_does_not_evict() {
        let mut store = ResourceStore::new();
        for page in 0..MAX_CACHE_SIZE {
            store.cache_page_data(page, &page_of("p", 1), "x");
        }
        store.cache_page_data(3, &page_of("q", 2), "q_2");
        assert_eq!(store.cached_pages(), MAX_CACHE_SIZE);
        assert!(store.cached_page(0).is_some());
        assert_eq!(store.cached_page(3).map(<[Item]>::len), Some(2));
        assert_eq!(store.cached_last_id(3), Some("q_2"));
    }

    #[test]
    fn cached_page_is_isolated_from_caller_data() {
        let mut store = ResourceStore::new();
        let mut data = page_of("p", 2);
        store.cache_page_data(0, &data, "p_2");

        data[0].id = "mutated".to_string();
        data[1].tags.push("extra".to_string());
        data.push(item("p_3"));

        let cached = store.cached_page(0).expect("cached");
        assert_eq!(cached, page_of("p", 2).as_slice());
    }

    #[test]
    fn clear_all_is_idempotent() {
        let mut store = ResourceStore::new();
        store.set_items(page_of("p", 3));
        store.set_loading(true);
        store.set_initial_loading(false);
        store.set_error(Some("boom".to_string()));
        store.set_current_page(2);
        store.set_page_size(10);
        store.set_total_count(42);
        store.set_has_more(true);
        store.set_search_query("dev");
        store.set_selected_index(2);
        store.cache_page_data(0, &page_of("p", 3), "p_3");

        store.clear_all();
        let once = store.clone();
        store.clear_all();
        assert_eq!(store, once);
        assert_eq!(store, ResourceStore::new());
        assert!(store.initial_loading());
        assert!(store.items().is_empty());
        assert_eq!(store.cached_pages(), 0);
    }

    #[test]
    fn selected_is_none_out_of_range() {
        let mut store: ResourceStore<Item> = ResourceStore::new();
        assert!(store.selected().is_none());

        store.set_items(page_of("p", 2));
        for index in [-1, -100, 2, 3, isize::MAX, isize::MIN] {
            store.set_selected_index(index);
            assert!(store.selected().is_none(), "index {index}");
        }
        store.set_selected_index(1);
        assert_eq!(store.selected().map(|item| item.id.as_str()), Some("p_2"));
    }

    #[test]
    fn only_latest_ticket_is_accepted() {
        let mut store: ResourceStore<Item> = ResourceStore::new();
        let first = store.begin_fetch();
        let second = store.begin_fetch();
        assert!(store.loading());
        assert!(!store.is_latest(first));
        assert!(store.is_latest(second));
    }

    #[test]
    fn cursor_pagination_end_to_end() {
        let mut store = ResourceStore::new();
        store.set_page_size(10);

        let first = page_of("item", 10);
        store.set_items(first.clone());
        store.set_has_more(true);
        store.cache_page_data(0, &first, "item_10");

        store.set_current_page(1);
        let cursor = store.cached_last_id(0).map(str::to_string);
        assert_eq!(cursor.as_deref(), Some("item_10"));
        let second: Vec<Item> = (11..=20).map(|n| item(&format!("item_{n}"))).collect();
        store.set_items(second.clone());
        store.cache_page_data(1, &second, "item_20");

        assert_eq!(store.cached_page(0), Some(first.as_slice()));
        assert_eq!(store.cached_page(1), Some(second.as_slice()));

        store.clear_cache();
        assert!(store.cached_page(0).is_none());
        assert!(store.cached_page(1).is_none());
        assert_eq!(store.current_page(), 1);
    }

    #[test]
    fn stores_are_independent_per_kind() {
        let mut stores = Stores::default();
        let record = ResourceRecord::from_value(json!({ "id": "bp_1" })).expect("record");
        stores
            .get_mut(ResourceKind::Blueprints)
            .set_items(vec![record]);
        assert_eq!(stores.get(ResourceKind::Blueprints).items().len(), 1);
        assert!(stores.get(ResourceKind::Devboxes).items().is_empty());

        stores.clear_all(ResourceKind::Blueprints);
        assert!(stores.get(ResourceKind::Blueprints).items().is_empty());
    }
}
