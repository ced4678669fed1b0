//! Listing query model
//!
//! A [`ListingQuery`] is what the host's listing pipeline finalises: the
//! targeted collections, optional group filters and the sort criteria.
//! [`QueryFilter`](super::QueryFilter)s may rewrite it before execution.

use serde::{Deserialize, Serialize};
use shared::models::{Item, ItemId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

/// Sort key of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "key", content = "ids")]
pub enum SortKey {
    Id,
    Title,
    OrderValue,
    /// 显式位置顺序：列表中的 id 在前 (按列表顺序)，其余按 id 升序排在后面
    Positional(Vec<ItemId>),
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "title" | "name" => Ok(Self::Title),
            "order_value" | "menu_order" => Ok(Self::OrderValue),
            other => Err(format!("unknown orderby: {other}")),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown order: {other}")),
        }
    }
}

/// Restrict a listing to members of one or more groups of a taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFilter {
    pub taxonomy: String,
    pub group_ids: Vec<ItemId>,
}

impl GroupFilter {
    pub fn new(taxonomy: impl Into<String>, group_ids: Vec<ItemId>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            group_ids,
        }
    }
}

/// `category:3` / `category:3,4`
impl FromStr for GroupFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (taxonomy, ids) = s
            .split_once(':')
            .ok_or_else(|| format!("group filter must be <taxonomy>:<id>[,<id>]: {s}"))?;
        if taxonomy.is_empty() {
            return Err(format!("group filter without taxonomy: {s}"));
        }

        let group_ids = ids
            .split(',')
            .map(|id| {
                id.trim()
                    .parse::<ItemId>()
                    .map_err(|_| format!("invalid group id: {id}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(taxonomy, group_ids))
    }
}

/// A listing request as seen by the query-filter extension point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingQuery {
    pub collections: Vec<String>,
    #[serde(default)]
    pub groups: Vec<GroupFilter>,
    /// None = 调用方未指定排序
    #[serde(default)]
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub direction: Option<Direction>,
}

impl ListingQuery {
    pub fn for_collection(collection: impl Into<String>) -> Self {
        Self {
            collections: vec![collection.into()],
            ..Default::default()
        }
    }

    pub fn with_group(mut self, filter: GroupFilter) -> Self {
        self.groups.push(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// The only targeted collection, if exactly one
    pub fn single_collection(&self) -> Option<&str> {
        match self.collections.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Total number of group ids across all filters
    pub fn group_id_count(&self) -> usize {
        self.groups.iter().map(|g| g.group_ids.len()).sum()
    }

    /// The only targeted group `(taxonomy, group_id)`, if exactly one
    pub fn single_group(&self) -> Option<(&str, ItemId)> {
        match self.groups.as_slice() {
            [filter] => match filter.group_ids.as_slice() {
                [id] => Some((filter.taxonomy.as_str(), *id)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Sort items by the final criteria of a query
///
/// Ties (and unlisted items of a positional sort) fall back to id ascending.
pub fn sort_items(items: &mut [Item], sort: Option<&SortKey>, direction: Option<Direction>) {
    let direction = direction.unwrap_or_default();
    let apply = |ord: Ordering| match direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
    };

    match sort.unwrap_or(&SortKey::Id) {
        SortKey::Id => items.sort_by(|a, b| apply(a.id.cmp(&b.id))),
        SortKey::Title => {
            items.sort_by(|a, b| apply(a.title.cmp(&b.title)).then(a.id.cmp(&b.id)))
        }
        SortKey::OrderValue => items
            .sort_by(|a, b| apply(a.order_value.cmp(&b.order_value)).then(a.id.cmp(&b.id))),
        SortKey::Positional(list) => {
            // 重复 id 以第一次出现为准
            let mut positions: HashMap<ItemId, usize> = HashMap::with_capacity(list.len());
            for (index, id) in list.iter().enumerate() {
                positions.entry(*id).or_insert(index);
            }

            items.sort_by(|a, b| {
                match (positions.get(&a.id), positions.get(&b.id)) {
                    (Some(pa), Some(pb)) => apply(pa.cmp(pb)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
                .then(a.id.cmp(&b.id))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, title: &str, order_value: i64) -> Item {
        Item {
            id,
            collection: "article".to_string(),
            title: title.to_string(),
            parent_id: 0,
            order_value,
        }
    }

    fn ids(items: &[Item]) -> Vec<ItemId> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_parse_group_filter() {
        let filter: GroupFilter = "category:3,4".parse().unwrap();
        assert_eq!(filter, GroupFilter::new("category", vec![3, 4]));

        assert!("category".parse::<GroupFilter>().is_err());
        assert!(":3".parse::<GroupFilter>().is_err());
        assert!("category:x".parse::<GroupFilter>().is_err());
    }

    #[test]
    fn test_parse_sort_and_direction() {
        assert_eq!("menu_order".parse::<SortKey>().unwrap(), SortKey::OrderValue);
        assert_eq!("title".parse::<SortKey>().unwrap(), SortKey::Title);
        assert!("date".parse::<SortKey>().is_err());
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
    }

    #[test]
    fn test_single_group() {
        let query = ListingQuery::for_collection("article")
            .with_group(GroupFilter::new("category", vec![3]));
        assert_eq!(query.single_group(), Some(("category", 3)));
        assert_eq!(query.group_id_count(), 1);

        let query = query.with_group(GroupFilter::new("tag", vec![9]));
        assert_eq!(query.single_group(), None);
        assert_eq!(query.group_id_count(), 2);
    }

    #[test]
    fn test_order_value_sort_ties_by_id() {
        let mut items = vec![item(3, "c", 1), item(1, "a", 1), item(2, "b", 0)];
        sort_items(&mut items, Some(&SortKey::OrderValue), None);
        assert_eq!(ids(&items), vec![2, 1, 3]);

        sort_items(&mut items, Some(&SortKey::OrderValue), Some(Direction::Desc));
        assert_eq!(ids(&items), vec![1, 3, 2]);
    }

    #[test]
    fn test_default_sort_is_id() {
        let mut items = vec![item(3, "a", 0), item(1, "b", 5), item(2, "c", 2)];
        sort_items(&mut items, None, None);
        assert_eq!(ids(&items), vec![1, 2, 3]);
    }

    #[test]
    fn test_positional_sort() {
        let mut items = vec![
            item(1, "a", 0),
            item(2, "b", 0),
            item(3, "c", 0),
            item(4, "d", 0),
        ];
        // 99 不在结果中 (过期条目)，3 重复
        let sort = SortKey::Positional(vec![3, 99, 1, 3]);

        sort_items(&mut items, Some(&sort), None);
        assert_eq!(ids(&items), vec![3, 1, 2, 4]);

        sort_items(&mut items, Some(&sort), Some(Direction::Desc));
        assert_eq!(ids(&items), vec![1, 3, 2, 4]);
    }
}
