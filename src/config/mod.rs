//! Runtime configuration for the repository layer.

/// Runtime configuration for cache TTLs, the admission filter, query limits,
/// and the cache namespace prefix.
///
/// Loaded from defaults with environment-variable overrides, in the style of
/// `SUBCOG_GRAPH_CACHE_*`-prefixed variables.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Per-deployment cache key prefix, fed to the Key Coder.
    pub cache_prefix: String,

    /// TTL for cached `Node` entries, in seconds.
    pub ttl_node_secs: u64,
    /// TTL for cached `Relation` entries, in seconds.
    pub ttl_relation_secs: u64,
    /// TTL for cached `SearchNodes` ID-lists, in seconds.
    pub ttl_search_secs: u64,
    /// TTL for cached `GetNetwork` ID-lists, in seconds.
    pub ttl_network_secs: u64,
    /// TTL for cached `GetPath` ID-lists, in seconds.
    pub ttl_path_secs: u64,
    /// TTL for cached `GetNodeRelations` ID-lists, in seconds.
    pub ttl_node_relations_secs: u64,
    /// TTL for `NilMarker` placeholders, in seconds.
    pub ttl_nil_marker_secs: u64,
    /// TTL for per-family empty composite placeholders, in seconds.
    pub ttl_empty_placeholder_secs: u64,

    /// Fractional jitter applied to every TTL (`effective = base + uniform(0, base * jitter)`).
    pub ttl_jitter_fraction: f64,

    /// Estimated number of distinct entity keys, used to size the admission filter.
    pub filter_estimated_keys: usize,
    /// Target false-positive rate for the admission filter.
    pub filter_fp_rate: f64,

    /// Upper bound on `GetNetwork` depth.
    pub get_network_max_depth: u32,
    /// Default `GetPath` max depth when the caller omits one.
    pub get_path_default_max_depth: u32,
    /// Upper bound on `GetPath` max depth.
    pub get_path_max_depth_limit: u32,

    /// Default `SearchNodes` result limit.
    pub search_nodes_default_limit: usize,
    /// Default `GetNodeRelations` result limit.
    pub get_node_relations_default_limit: usize,

    /// Concurrency cap for rehydration fan-out in the composite query engine.
    pub rehydration_concurrency: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            cache_prefix: "gc".to_string(),
            ttl_node_secs: 300,
            ttl_relation_secs: 300,
            ttl_search_secs: 60,
            ttl_network_secs: 60,
            ttl_path_secs: 60,
            ttl_node_relations_secs: 60,
            ttl_nil_marker_secs: 300,
            ttl_empty_placeholder_secs: 300,
            ttl_jitter_fraction: 0.10,
            filter_estimated_keys: 100_000,
            filter_fp_rate: 0.01,
            get_network_max_depth: 5,
            get_path_default_max_depth: 3,
            get_path_max_depth_limit: 6,
            search_nodes_default_limit: 10,
            get_node_relations_default_limit: 10,
            rehydration_concurrency: 8,
        }
    }
}

impl RepositoryConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds configuration from environment variables, starting from
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment-variable overrides on top of the current values.
    ///
    /// Recognised variables are prefixed `SUBCOG_GRAPH_CACHE_` and named
    /// after the corresponding field in `SCREAMING_SNAKE_CASE`.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("SUBCOG_GRAPH_CACHE_PREFIX") {
            self.cache_prefix = v;
        }
        set_env_u64(&mut self.ttl_node_secs, "SUBCOG_GRAPH_CACHE_TTL_NODE_SECS");
        set_env_u64(
            &mut self.ttl_relation_secs,
            "SUBCOG_GRAPH_CACHE_TTL_RELATION_SECS",
        );
        set_env_u64(
            &mut self.ttl_search_secs,
            "SUBCOG_GRAPH_CACHE_TTL_SEARCH_SECS",
        );
        set_env_u64(
            &mut self.ttl_network_secs,
            "SUBCOG_GRAPH_CACHE_TTL_NETWORK_SECS",
        );
        set_env_u64(&mut self.ttl_path_secs, "SUBCOG_GRAPH_CACHE_TTL_PATH_SECS");
        set_env_u64(
            &mut self.ttl_node_relations_secs,
            "SUBCOG_GRAPH_CACHE_TTL_NODE_RELATIONS_SECS",
        );
        set_env_u64(
            &mut self.ttl_nil_marker_secs,
            "SUBCOG_GRAPH_CACHE_TTL_NIL_MARKER_SECS",
        );
        set_env_u64(
            &mut self.ttl_empty_placeholder_secs,
            "SUBCOG_GRAPH_CACHE_TTL_EMPTY_PLACEHOLDER_SECS",
        );
        set_env_f64(
            &mut self.ttl_jitter_fraction,
            "SUBCOG_GRAPH_CACHE_TTL_JITTER_FRACTION",
        );
        set_env_usize(
            &mut self.filter_estimated_keys,
            "SUBCOG_GRAPH_CACHE_FILTER_ESTIMATED_KEYS",
        );
        set_env_f64(
            &mut self.filter_fp_rate,
            "SUBCOG_GRAPH_CACHE_FILTER_FP_RATE",
        );
        set_env_u32(
            &mut self.get_network_max_depth,
            "SUBCOG_GRAPH_CACHE_GET_NETWORK_MAX_DEPTH",
        );
        set_env_u32(
            &mut self.get_path_default_max_depth,
            "SUBCOG_GRAPH_CACHE_GET_PATH_DEFAULT_MAX_DEPTH",
        );
        set_env_u32(
            &mut self.get_path_max_depth_limit,
            "SUBCOG_GRAPH_CACHE_GET_PATH_MAX_DEPTH_LIMIT",
        );
        set_env_usize(
            &mut self.search_nodes_default_limit,
            "SUBCOG_GRAPH_CACHE_SEARCH_NODES_DEFAULT_LIMIT",
        );
        set_env_usize(
            &mut self.get_node_relations_default_limit,
            "SUBCOG_GRAPH_CACHE_GET_NODE_RELATIONS_DEFAULT_LIMIT",
        );
        set_env_usize(
            &mut self.rehydration_concurrency,
            "SUBCOG_GRAPH_CACHE_REHYDRATION_CONCURRENCY",
        );
        self
    }
}

fn set_env_u64(field: &mut u64, key: &str) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

fn set_env_u32(field: &mut u32, key: &str) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

fn set_env_usize(field: &mut usize, key: &str) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

fn set_env_f64(field: &mut f64, key: &str) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}
