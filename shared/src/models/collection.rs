//! Collection Type Model

use serde::{Deserialize, Serialize};

/// 集合类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Post-like collection (articles, pages, ...)
    Post,
    /// Term-like collection; its items act as grouping entities
    Taxonomy,
}

/// Capability flags of a collection type
///
/// Unknown keys are ignored and missing keys default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSupports {
    /// 显示手动排序界面 / 允许提交排序
    pub order_manager: bool,
    /// 默认列表查询使用存储的排序值
    pub query_override: bool,
    /// 按分组 (如单个分类) 手动排序成员 (仅 taxonomy)
    pub per_group_order: bool,
    /// 单分组查询使用排序值 (仅 taxonomy)
    pub group_query_override: bool,
}

/// A single capability, used for support checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    OrderManager,
    QueryOverride,
    PerGroupOrder,
    GroupQueryOverride,
}

impl CollectionSupports {
    pub fn has(&self, support: Support) -> bool {
        match support {
            Support::OrderManager => self.order_manager,
            Support::QueryOverride => self.query_override,
            Support::PerGroupOrder => self.per_group_order,
            Support::GroupQueryOverride => self.group_query_override,
        }
    }
}

/// Collection type entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionType {
    pub name: String,
    pub kind: CollectionKind,
    #[serde(default)]
    pub hierarchical: bool,
    #[serde(default)]
    pub supports: CollectionSupports,
    /// Post collections whose items may belong to this taxonomy's groups
    #[serde(default)]
    pub object_types: Vec<String>,
}

impl CollectionType {
    pub fn is_taxonomy(&self) -> bool {
        self.kind == CollectionKind::Taxonomy
    }

    pub fn supports(&self, support: Support) -> bool {
        self.supports.has(support)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_missing_keys_default_false() {
        let supports: CollectionSupports =
            serde_json::from_str(r#"{"order_manager": true, "legacy_flag": true}"#).unwrap();
        assert!(supports.has(Support::OrderManager));
        assert!(!supports.has(Support::QueryOverride));
        assert!(!supports.has(Support::PerGroupOrder));
    }

    #[test]
    fn test_collection_type_deserialize() {
        let ct: CollectionType = serde_json::from_str(
            r#"{"name": "category", "kind": "taxonomy", "hierarchical": true,
                "supports": {"per_group_order": true}, "object_types": ["article"]}"#,
        )
        .unwrap();
        assert!(ct.is_taxonomy());
        assert!(ct.supports(Support::PerGroupOrder));
        assert_eq!(ct.object_types, vec!["article".to_string()]);
    }
}
