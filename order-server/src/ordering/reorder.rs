//! Reorder Transaction Handler
//!
//! 处理拖拽排序提交：先检查配置、权限、提交内容，全部通过后才开始写入。
//!
//! 写入是逐条进行的 (每条独立事务)，中途失败不会回滚已写入的条目；
//! 同一提交重复执行结果一致。

use super::error::{ConfigurationError, OrderingError, OrderingResult, ValidationError};
use crate::auth::{CurrentUser, permissions::can_manage_order};
use crate::content::ContentStore;
use crate::registry::Registry;
use crate::security_log;
use crate::store::OrderStore;
use serde::{Deserialize, Serialize};
use shared::models::{CollectionType, ItemId, ROOT_PARENT, Support};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// What a submission reorders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderTarget {
    /// 整个集合 (写入每个 item 的 order_value / parent_id)
    Collection(String),
    /// 单个分组内的成员顺序 (存储为一个列表)
    Group { taxonomy: String, group_id: ItemId },
}

impl ReorderTarget {
    /// Collection whose registration and permissions govern the target
    pub fn collection(&self) -> &str {
        match self {
            Self::Collection(name) => name,
            Self::Group { taxonomy, .. } => taxonomy,
        }
    }

    /// Manager view path with the confirmation flag
    pub fn redirect_path(&self) -> String {
        match self {
            Self::Collection(name) => format!("/api/ordering/{name}?updated=true"),
            Self::Group { taxonomy, group_id } => {
                format!("/api/ordering/{taxonomy}/groups/{group_id}?updated=true")
            }
        }
    }
}

/// Item identifier as submitted: a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    pub fn parse(&self) -> Result<ItemId, ValidationError> {
        match self {
            Self::Number(id) => Ok(*id),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ValidationError::NonNumeric(text.clone())),
        }
    }
}

impl From<ItemId> for RawId {
    fn from(id: ItemId) -> Self {
        Self::Number(id)
    }
}

/// A drag-and-drop submission
///
/// ```json
/// { "order": [3, "1", 2], "parents": { "1": 3, "2": 0 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderSubmission {
    #[serde(default)]
    pub order: Vec<RawId>,
    #[serde(default)]
    pub parents: HashMap<String, RawId>,
}

impl ReorderSubmission {
    /// Decode a request body; an empty body is an empty submission
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ValidationError::Empty);
        }
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Build a submission from a depth-first `(id, parent_id)` sequence
    pub fn from_flattened(flat: &[(ItemId, ItemId)]) -> Self {
        Self {
            order: flat.iter().map(|(id, _)| RawId::from(*id)).collect(),
            parents: flat
                .iter()
                .map(|(id, parent)| (id.to_string(), RawId::from(*parent)))
                .collect(),
        }
    }

    /// Check well-formedness and decode identifiers
    pub fn parse(&self) -> Result<ParsedSubmission, ValidationError> {
        if self.order.is_empty() {
            return Err(ValidationError::Empty);
        }

        let mut order = Vec::with_capacity(self.order.len());
        let mut seen = HashSet::with_capacity(self.order.len());
        for raw in &self.order {
            let id = raw.parse()?;
            if !seen.insert(id) {
                return Err(ValidationError::Duplicate(id));
            }
            order.push(id);
        }

        // 按键排序处理，同一提交总是得到同一结果
        let mut entries: Vec<_> = self.parents.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut parents = BTreeMap::new();
        for (key, raw_parent) in entries {
            let id: ItemId = key
                .trim()
                .parse()
                .map_err(|_| ValidationError::NonNumeric(key.clone()))?;
            if !seen.contains(&id) {
                return Err(ValidationError::ParentWithoutItem(id));
            }
            // "3" / "03" / " 3" 指向同一个 item
            if parents.insert(id, raw_parent.parse()?).is_some() {
                return Err(ValidationError::Duplicate(id));
            }
        }

        Ok(ParsedSubmission { order, parents })
    }
}

/// A well-formed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSubmission {
    pub order: Vec<ItemId>,
    pub parents: BTreeMap<ItemId, ItemId>,
}

/// Successful reorder acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderOutcome {
    pub updated: usize,
    pub redirect_to: String,
}

/// Validates and applies reorder submissions
#[derive(Debug, Clone)]
pub struct ReorderHandler {
    pub(super) registry: Arc<Registry>,
    pub(super) orders: OrderStore,
    pub(super) content: ContentStore,
}

impl ReorderHandler {
    pub fn new(registry: Arc<Registry>, orders: OrderStore, content: ContentStore) -> Self {
        Self {
            registry,
            orders,
            content,
        }
    }

    /// Apply a raw request body (decoded after the configuration and
    /// permission checks)
    pub fn apply_json(
        &self,
        user: &CurrentUser,
        target: &ReorderTarget,
        body: &[u8],
    ) -> OrderingResult<ReorderOutcome> {
        let collection = self.resolve(target)?;
        self.authorize(user, target)?;
        let submission = ReorderSubmission::from_json(body)?;
        self.apply_checked(collection, target, &submission)
    }

    /// Apply a decoded submission
    pub fn apply(
        &self,
        user: &CurrentUser,
        target: &ReorderTarget,
        submission: &ReorderSubmission,
    ) -> OrderingResult<ReorderOutcome> {
        let collection = self.resolve(target)?;
        self.authorize(user, target)?;
        self.apply_checked(collection, target, submission)
    }

    /// Resolve the target to its registered, ordering-enabled collection
    pub fn resolve(&self, target: &ReorderTarget) -> OrderingResult<&CollectionType> {
        let name = target.collection();
        let collection = self
            .registry
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownCollection(name.to_string()))?;

        match target {
            ReorderTarget::Collection(_) => {
                if !collection.supports(Support::OrderManager) {
                    return Err(ConfigurationError::NotEnabled(name.to_string()).into());
                }
            }
            ReorderTarget::Group { taxonomy, group_id } => {
                if !collection.is_taxonomy() || !collection.supports(Support::PerGroupOrder) {
                    return Err(ConfigurationError::GroupOrderNotEnabled(name.to_string()).into());
                }
                if self.content.get_item(taxonomy, *group_id)?.is_none() {
                    return Err(ConfigurationError::GroupNotFound {
                        taxonomy: taxonomy.clone(),
                        group_id: *group_id,
                    }
                    .into());
                }
            }
        }

        Ok(collection)
    }

    fn authorize(&self, user: &CurrentUser, target: &ReorderTarget) -> OrderingResult<()> {
        if can_manage_order(user, target.collection()) {
            return Ok(());
        }

        security_log!(
            "WARN",
            "ordering_forbidden",
            user_id = user.id.clone(),
            username = user.username.clone(),
            collection = target.collection().to_string()
        );
        Err(OrderingError::Authorization)
    }

    fn apply_checked(
        &self,
        collection: &CollectionType,
        target: &ReorderTarget,
        submission: &ReorderSubmission,
    ) -> OrderingResult<ReorderOutcome> {
        let parsed = submission.parse()?;

        let updated = match target {
            ReorderTarget::Collection(name) => self.write_collection(collection, name, &parsed)?,
            ReorderTarget::Group { taxonomy, group_id } => {
                if !parsed.parents.is_empty() {
                    tracing::debug!(taxonomy = %taxonomy, group_id, "Parents ignored for group ordering");
                }
                self.orders.set_group_order(taxonomy, *group_id, &parsed.order)?;
                parsed.order.len()
            }
        };

        tracing::info!(
            collection = %target.collection(),
            count = updated,
            "Order saved"
        );

        Ok(ReorderOutcome {
            updated,
            redirect_to: target.redirect_path(),
        })
    }

    fn write_collection(
        &self,
        collection: &CollectionType,
        name: &str,
        parsed: &ParsedSubmission,
    ) -> OrderingResult<usize> {
        let current = self.content.parents(name)?;
        let no_parents = BTreeMap::new();
        for id in &parsed.order {
            if !current.contains_key(id) {
                return Err(ValidationError::UnknownItem(*id).into());
            }
        }

        let parents = if collection.hierarchical {
            for (&item_id, &parent_id) in &parsed.parents {
                if parent_id != ROOT_PARENT && !current.contains_key(&parent_id) {
                    return Err(ValidationError::UnknownParent { item_id, parent_id }.into());
                }
            }
            check_cycles(&current, &parsed.parents)?;
            &parsed.parents
        } else {
            if !parsed.parents.is_empty() {
                tracing::debug!(collection = %name, "Parents ignored for flat collection");
            }
            &no_parents
        };

        // 逐条写入，失败时已写入的条目保留
        for (position, id) in parsed.order.iter().enumerate() {
            self.orders.set_order_value(name, *id, position as i64)?;
            if let Some(parent_id) = parents.get(id) {
                self.orders.set_parent(name, *id, *parent_id)?;
            }
        }

        Ok(parsed.order.len())
    }
}

/// Reject submissions that make an item its own ancestor
///
/// Submitted parents are overlaid on the current ones; every submitted item's
/// ancestor chain must reach the root without revisiting a node.
fn check_cycles(
    current: &HashMap<ItemId, ItemId>,
    submitted: &BTreeMap<ItemId, ItemId>,
) -> Result<(), ValidationError> {
    let parent_of = |id: ItemId| {
        submitted
            .get(&id)
            .or_else(|| current.get(&id))
            .copied()
            .unwrap_or(ROOT_PARENT)
    };

    for &start in submitted.keys() {
        let mut visited = HashSet::from([start]);
        let mut cursor = parent_of(start);
        while cursor != ROOT_PARENT {
            if !visited.insert(cursor) {
                return Err(ValidationError::ParentCycle(start));
            }
            cursor = parent_of(cursor);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ListingQuery, SortKey};
    use crate::store::open_in_memory;
    use shared::models::{CollectionSupports, ItemCreate};

    struct Fixture {
        handler: ReorderHandler,
        orders: OrderStore,
        content: ContentStore,
    }

    fn enabled() -> CollectionSupports {
        CollectionSupports {
            order_manager: true,
            per_group_order: true,
            ..Default::default()
        }
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(
            Registry::builder()
                .register_post_type("article", false, enabled())
                .unwrap()
                .register_post_type("page", true, enabled())
                .unwrap()
                .register_post_type("event", false, CollectionSupports::default())
                .unwrap()
                .register_taxonomy("category", true, enabled(), &["article"])
                .unwrap()
                .build(),
        );
        let db = open_in_memory().unwrap();
        let orders = OrderStore::new(db.clone()).unwrap();
        let content = ContentStore::new(db, orders.clone(), registry.clone()).unwrap();
        Fixture {
            handler: ReorderHandler::new(registry, orders.clone(), content.clone()),
            orders,
            content,
        }
    }

    fn create(content: &ContentStore, collection: &str, parent_id: ItemId) -> ItemId {
        content
            .create_item(
                collection,
                ItemCreate {
                    title: format!("{collection} item"),
                    parent_id,
                },
            )
            .unwrap()
            .id
    }

    fn editor() -> CurrentUser {
        CurrentUser {
            id: "2".to_string(),
            username: "editor".to_string(),
            role: "editor".to_string(),
            permissions: vec!["ordering:manage".to_string()],
        }
    }

    fn submission(order: &[ItemId], parents: &[(ItemId, ItemId)]) -> ReorderSubmission {
        ReorderSubmission {
            order: order.iter().map(|id| RawId::from(*id)).collect(),
            parents: parents
                .iter()
                .map(|(id, p)| (id.to_string(), RawId::from(*p)))
                .collect(),
        }
    }

    fn order_value(orders: &OrderStore, collection: &str, id: ItemId) -> Option<i64> {
        orders.get_meta(collection, id).unwrap().and_then(|m| m.order_value)
    }

    #[test]
    fn test_order_values_match_positions() {
        let f = fixture();
        let a = create(&f.content, "article", 0);
        let b = create(&f.content, "article", 0);
        let c = create(&f.content, "article", 0);
        let target = ReorderTarget::Collection("article".into());

        let outcome = f
            .handler
            .apply(&editor(), &target, &submission(&[c, a, b], &[]))
            .unwrap();

        assert_eq!(outcome.updated, 3);
        assert_eq!(outcome.redirect_to, "/api/ordering/article?updated=true");
        assert_eq!(order_value(&f.orders, "article", c), Some(0));
        assert_eq!(order_value(&f.orders, "article", a), Some(1));
        assert_eq!(order_value(&f.orders, "article", b), Some(2));
    }

    #[test]
    fn test_reorder_is_idempotent() {
        let f = fixture();
        let a = create(&f.content, "page", 0);
        let b = create(&f.content, "page", 0);
        let target = ReorderTarget::Collection("page".into());
        let sub = submission(&[b, a], &[(a, b)]);

        f.handler.apply(&editor(), &target, &sub).unwrap();
        let first = f.orders.meta_for_collection("page").unwrap();
        f.handler.apply(&editor(), &target, &sub).unwrap();
        assert_eq!(f.orders.meta_for_collection("page").unwrap(), first);
    }

    #[test]
    fn test_parent_map_applies_only_to_listed_items() {
        let f = fixture();
        let a = create(&f.content, "page", 0);
        let c_parent = create(&f.content, "page", 0);
        let b = create(&f.content, "page", 0);
        let c = create(&f.content, "page", c_parent);
        let target = ReorderTarget::Collection("page".into());

        f.handler
            .apply(&editor(), &target, &submission(&[a, b, c], &[(b, a)]))
            .unwrap();

        let parent = |id| f.orders.get_meta("page", id).unwrap().unwrap().parent_id;
        assert_eq!(parent(b), a);
        assert_eq!(parent(a), 0);
        assert_eq!(parent(c), c_parent);
    }

    #[test]
    fn test_parents_ignored_for_flat_collection() {
        let f = fixture();
        let a = create(&f.content, "article", 0);
        let b = create(&f.content, "article", 0);
        let target = ReorderTarget::Collection("article".into());

        f.handler
            .apply(&editor(), &target, &submission(&[a, b], &[(b, a)]))
            .unwrap();
        assert_eq!(f.orders.get_meta("article", b).unwrap().unwrap().parent_id, 0);
    }

    #[test]
    fn test_disabled_collection_rejected_without_writes() {
        let f = fixture();
        let a = create(&f.content, "event", 0);
        let target = ReorderTarget::Collection("event".into());

        let err = f
            .handler
            .apply(&editor(), &target, &submission(&[a], &[]))
            .unwrap_err();
        assert!(matches!(
            err,
            OrderingError::Configuration(ConfigurationError::NotEnabled(_))
        ));
        assert_eq!(order_value(&f.orders, "event", a), None);

        let err = f
            .handler
            .apply(
                &editor(),
                &ReorderTarget::Collection("movie".into()),
                &submission(&[a], &[]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            OrderingError::Configuration(ConfigurationError::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_unauthorized_rejected_without_writes() {
        let f = fixture();
        let a = create(&f.content, "article", 0);
        let viewer = CurrentUser {
            permissions: vec!["ordering:page".to_string()],
            ..editor()
        };

        let err = f
            .handler
            .apply(
                &viewer,
                &ReorderTarget::Collection("article".into()),
                &submission(&[a], &[]),
            )
            .unwrap_err();
        assert!(matches!(err, OrderingError::Authorization));
        assert_eq!(order_value(&f.orders, "article", a), None);
    }

    #[test]
    fn test_validation_failures_write_nothing() {
        let f = fixture();
        let a = create(&f.content, "page", 0);
        let b = create(&f.content, "page", 0);
        let other = create(&f.content, "article", 0);
        let target = ReorderTarget::Collection("page".into());

        let cases = vec![
            (submission(&[], &[]), ValidationError::Empty),
            (submission(&[a, b, a], &[]), ValidationError::Duplicate(a)),
            (submission(&[a, other], &[]), ValidationError::UnknownItem(other)),
            (
                submission(&[a], &[(b, 0)]),
                ValidationError::ParentWithoutItem(b),
            ),
            (
                submission(&[a, b], &[(b, 999)]),
                ValidationError::UnknownParent {
                    item_id: b,
                    parent_id: 999,
                },
            ),
            (submission(&[a], &[(a, a)]), ValidationError::ParentCycle(a)),
            (
                submission(&[a, b], &[(a, b), (b, a)]),
                ValidationError::ParentCycle(a),
            ),
        ];

        for (sub, expected) in cases {
            match f.handler.apply(&editor(), &target, &sub) {
                Err(OrderingError::Validation(e)) => assert_eq!(e, expected),
                other => panic!("expected {expected:?}, got {other:?}"),
            }
        }
        assert_eq!(order_value(&f.orders, "page", a), None);
        assert_eq!(order_value(&f.orders, "page", b), None);
    }

    #[test]
    fn test_cycle_through_existing_parents() {
        let f = fixture();
        let a = create(&f.content, "page", 0);
        let b = create(&f.content, "page", a);
        let target = ReorderTarget::Collection("page".into());

        // b 已经是 a 的子节点，再把 a 挂到 b 下形成环
        let err = f
            .handler
            .apply(&editor(), &target, &submission(&[a], &[(a, b)]))
            .unwrap_err();
        assert!(matches!(
            err,
            OrderingError::Validation(ValidationError::ParentCycle(_))
        ));
    }

    #[test]
    fn test_group_order_stored_verbatim() {
        let f = fixture();
        let news = create(&f.content, "category", 0);
        let a = create(&f.content, "article", 0);
        let b = create(&f.content, "article", 0);
        let target = ReorderTarget::Group {
            taxonomy: "category".into(),
            group_id: news,
        };

        let outcome = f
            .handler
            .apply(&editor(), &target, &submission(&[b, a, 999], &[(a, b)]))
            .unwrap();

        assert_eq!(outcome.updated, 3);
        assert_eq!(
            outcome.redirect_to,
            format!("/api/ordering/category/groups/{news}?updated=true")
        );
        assert_eq!(f.orders.get_group_order("category", news).unwrap(), vec![b, a, 999]);
        // 分组模式不写 item 级排序值
        assert_eq!(order_value(&f.orders, "article", a), None);
    }

    #[test]
    fn test_group_target_checks() {
        let f = fixture();
        let err = f
            .handler
            .resolve(&ReorderTarget::Group {
                taxonomy: "category".into(),
                group_id: 42,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            OrderingError::Configuration(ConfigurationError::GroupNotFound { .. })
        ));

        let err = f
            .handler
            .resolve(&ReorderTarget::Group {
                taxonomy: "article".into(),
                group_id: 1,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            OrderingError::Configuration(ConfigurationError::GroupOrderNotEnabled(_))
        ));
    }

    #[test]
    fn test_apply_json_accepts_numeric_strings() {
        let f = fixture();
        let a = create(&f.content, "page", 0);
        let b = create(&f.content, "page", 0);
        let target = ReorderTarget::Collection("page".into());
        let body = format!(r#"{{"order": ["{b}", {a}], "parents": {{"{a}": "{b}"}}}}"#);

        f.handler
            .apply_json(&editor(), &target, body.as_bytes())
            .unwrap();
        assert_eq!(order_value(&f.orders, "page", b), Some(0));
        assert_eq!(order_value(&f.orders, "page", a), Some(1));
        assert_eq!(f.orders.get_meta("page", a).unwrap().unwrap().parent_id, b);
    }

    #[test]
    fn test_apply_json_rejects_bad_bodies() {
        let f = fixture();
        let target = ReorderTarget::Collection("page".into());

        for (body, expected) in [
            ("", "empty"),
            ("  ", "empty"),
            ("{not json", "malformed"),
            (r#"{"order": ["abc"]}"#, "non-numeric"),
        ] {
            let err = f
                .handler
                .apply_json(&editor(), &target, body.as_bytes())
                .unwrap_err();
            let ok = match (&err, expected) {
                (OrderingError::Validation(ValidationError::Empty), "empty") => true,
                (OrderingError::Validation(ValidationError::Malformed(_)), "malformed") => true,
                (OrderingError::Validation(ValidationError::NonNumeric(_)), "non-numeric") => true,
                _ => false,
            };
            assert!(ok, "body {body:?}: unexpected {err:?}");
        }
    }

    #[test]
    fn test_aliased_parent_keys_rejected() {
        let body = br#"{"order": [1, 2, 3], "parents": {"3": 1, "03": 2, " 3": 0}}"#;
        for _ in 0..50 {
            let sub = ReorderSubmission::from_json(body).unwrap();
            assert_eq!(sub.parse(), Err(ValidationError::Duplicate(3)));
        }

        let f = fixture();
        let a = create(&f.content, "page", 0);
        let b = create(&f.content, "page", 0);
        let target = ReorderTarget::Collection("page".into());
        let body = format!(r#"{{"order": [{a}, {b}], "parents": {{"{b}": {a}, "0{b}": 0}}}}"#);
        let err = f
            .handler
            .apply_json(&editor(), &target, body.as_bytes())
            .unwrap_err();
        assert!(matches!(
            err,
            OrderingError::Validation(ValidationError::Duplicate(id)) if id == b
        ));
        assert_eq!(order_value(&f.orders, "page", a), None);
    }

    #[test]
    fn test_unlisted_items_keep_their_order_value() {
        let f = fixture();
        let a = create(&f.content, "article", 0);
        let b = create(&f.content, "article", 0);
        let c = create(&f.content, "article", 0);
        f.orders.set_order_value("article", c, 1).unwrap();
        let target = ReorderTarget::Collection("article".into());

        let outcome = f
            .handler
            .apply(&editor(), &target, &submission(&[b, a], &[]))
            .unwrap();
        assert_eq!(outcome.updated, 2);

        assert_eq!(order_value(&f.orders, "article", b), Some(0));
        assert_eq!(order_value(&f.orders, "article", a), Some(1));
        // c 未提交，保留旧值，与 a 相同
        assert_eq!(order_value(&f.orders, "article", c), Some(1));

        let listed: Vec<_> = f
            .content
            .execute(&ListingQuery::for_collection("article").with_sort(SortKey::OrderValue))
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(listed, vec![b, a, c]);
    }

    #[test]
    fn test_submission_from_flattened() {
        let sub = ReorderSubmission::from_flattened(&[(1, 0), (2, 1)]);
        let parsed = sub.parse().unwrap();
        assert_eq!(parsed.order, vec![1, 2]);
        assert_eq!(parsed.parents.get(&2), Some(&1));
        assert_eq!(parsed.parents.get(&1), Some(&0));
    }
}
