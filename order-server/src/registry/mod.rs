//! Collection Registry - 集合类型及其排序能力
//!
//! 启动时加载一次，之后不可变，通过 `Arc<Registry>` 注入到各个组件。
//!
//! # 配置文件格式
//!
//! ```json
//! {
//!   "collections": [
//!     { "name": "article", "kind": "post",
//!       "supports": { "order_manager": true, "query_override": true } },
//!     { "name": "category", "kind": "taxonomy", "hierarchical": true,
//!       "object_types": ["article"],
//!       "supports": { "order_manager": true, "per_group_order": true } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use shared::models::{CollectionKind, CollectionSupports, CollectionType, Support};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse registry file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Collection registered twice: {0}")]
    Duplicate(String),
}

/// On-disk representation
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    collections: Vec<CollectionType>,
}

/// Immutable set of registered collection types
#[derive(Debug, Clone, Default)]
pub struct Registry {
    collections: BTreeMap<String, CollectionType>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// 从 JSON 文件加载；文件不存在时返回空注册表
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Registry file not found, no collection is ordered");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            count = registry.collections.len(),
            "Collection registry loaded"
        );
        Ok(registry)
    }

    pub fn from_json(content: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(content)?;
        let mut builder = Self::builder();
        for collection in file.collections {
            builder = builder.register(collection)?;
        }
        Ok(builder.build())
    }

    pub fn get(&self, name: &str) -> Option<&CollectionType> {
        self.collections.get(name)
    }

    /// 集合是否注册并开启了指定能力
    pub fn is_supported(&self, name: &str, support: Support) -> bool {
        self.get(name).is_some_and(|c| c.supports(support))
    }

    pub fn collections(&self) -> impl Iterator<Item = &CollectionType> {
        self.collections.values()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Builder used at startup (and by tests) to assemble a [`Registry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    collections: BTreeMap<String, CollectionType>,
}

impl RegistryBuilder {
    /// Register a post-like collection
    pub fn register_post_type(
        self,
        name: impl Into<String>,
        hierarchical: bool,
        supports: CollectionSupports,
    ) -> Result<Self, RegistryError> {
        self.register(CollectionType {
            name: name.into(),
            kind: CollectionKind::Post,
            hierarchical,
            supports,
            object_types: Vec::new(),
        })
    }

    /// Register a term-like collection whose items group `object_types`
    pub fn register_taxonomy(
        self,
        name: impl Into<String>,
        hierarchical: bool,
        supports: CollectionSupports,
        object_types: &[&str],
    ) -> Result<Self, RegistryError> {
        self.register(CollectionType {
            name: name.into(),
            kind: CollectionKind::Taxonomy,
            hierarchical,
            supports,
            object_types: object_types.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn register(mut self, mut collection: CollectionType) -> Result<Self, RegistryError> {
        if self.collections.contains_key(&collection.name) {
            return Err(RegistryError::Duplicate(collection.name));
        }

        // 分组排序只对 taxonomy 有意义
        if collection.kind == CollectionKind::Post
            && (collection.supports.per_group_order || collection.supports.group_query_override)
        {
            tracing::warn!(
                collection = %collection.name,
                "Per-group flags ignored on a post collection"
            );
            collection.supports.per_group_order = false;
            collection.supports.group_query_override = false;
        }

        self.collections.insert(collection.name.clone(), collection);
        Ok(self)
    }

    pub fn unregister(mut self, name: &str) -> Self {
        self.collections.remove(name);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            collections: self.collections,
        }
    }
}
