use crate::graph::StreetGraph;
use crate::models::AmenityRecord;
use lazy_static::lazy_static;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

const CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(size) => size,
    None => panic!("cache size must be non-zero"),
};

// Keyed by the Overpass query that produced the value
lazy_static! {
    static ref GRAPH_CACHE: Mutex<LruCache<String, Arc<StreetGraph>>> =
        Mutex::new(LruCache::new(CACHE_SIZE));
    static ref AMENITY_CACHE: Mutex<LruCache<String, Arc<Vec<AmenityRecord>>>> =
        Mutex::new(LruCache::new(CACHE_SIZE));
}

pub fn check_graph_cache(query: &str) -> Option<Arc<StreetGraph>> {
    let mut cache = GRAPH_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    cache.get(query).cloned()
}

pub fn insert_graph(query: String, graph: Arc<StreetGraph>) {
    let mut cache = GRAPH_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    cache.put(query, graph);
}

pub fn check_amenity_cache(query: &str) -> Option<Arc<Vec<AmenityRecord>>> {
    let mut cache = AMENITY_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    cache.get(query).cloned()
}

pub fn insert_amenities(query: String, amenities: Arc<Vec<AmenityRecord>>) {
    let mut cache = AMENITY_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    cache.put(query, amenities);
}
