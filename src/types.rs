use crate::job::Job;
use indexmap::{IndexMap as _IndexMap, IndexSet as _IndexSet};
use rustc_hash::FxBuildHasher;
use std::{
    collections::{HashMap as _HashMap, HashSet as _HashSet},
    sync::Arc,
};

/// A job shared between the producer that created it, the queue and the
/// coordinator's batch.
pub type SharedJob = Arc<Job>;

/// `HashMap` type with fast hasher.
pub type HashMap<K, V> = _HashMap<K, V, FxBuildHasher>;
/// `HashSet` type with fast hasher.
pub type HashSet<T> = _HashSet<T, FxBuildHasher>;
/// `IndexMap` type with fast hasher.
pub type IndexMap<K, V> = _IndexMap<K, V, FxBuildHasher>;
/// `IndexSet` type with fast hasher.
pub type IndexSet<T> = _IndexSet<T, FxBuildHasher>;
