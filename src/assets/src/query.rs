//! Composable asset queries
//!
//! An [`AssetQuery`] is a list of predicates combined with AND, applied to
//! an asset collection, then de-duplicated and ordered. [`AssetListParams`]
//! turns listing query-string parameters into a query, resolving node and
//! admin-user references against a store.

use bastion_core::{AdminUserId, AssetId, NodeId, OrgId};
use serde::Deserialize;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;
use tracing::debug;

use crate::error::{AssetError, Result};
use crate::node::NodeFilter;
use crate::store::AssetStore;
use crate::types::{Asset, Label};

/// A single asset predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetFilter {
    /// Assets owned by the organization
    Org(OrgId),
    /// Node hierarchy visibility
    Node(NodeFilter),
    /// Exact admin user match
    AdminUser(AdminUserId),
    /// Exact hostname match
    Hostname(String),
    /// Exact IP match
    Ip(String),
    /// Case-insensitive substring over hostname and IP
    Search(String),
    /// Asset id in the given set
    Ids(BTreeSet<AssetId>),
    /// Asset carries the label
    Label(Label),
}

impl AssetFilter {
    /// Check if this predicate holds for the asset
    pub fn matches(&self, asset: &Asset) -> bool {
        match self {
            AssetFilter::Org(org) => &asset.org_id == org,
            AssetFilter::Node(filter) => filter.matches(asset),
            AssetFilter::AdminUser(id) => asset.admin_user == Some(*id),
            AssetFilter::Hostname(hostname) => &asset.hostname == hostname,
            AssetFilter::Ip(ip) => &asset.ip == ip,
            AssetFilter::Search(term) => {
                let term = term.to_lowercase();
                asset.hostname.to_lowercase().contains(&term)
                    || asset.ip.to_lowercase().contains(&term)
            }
            AssetFilter::Ids(ids) => ids.contains(&asset.id),
            AssetFilter::Label(label) => asset.labels.contains(label),
        }
    }
}

/// Sortable asset fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Hostname,
    Ip,
    Port,
    CpuCores,
}

impl FromStr for OrderField {
    type Err = AssetError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hostname" => Ok(OrderField::Hostname),
            "ip" => Ok(OrderField::Ip),
            "port" => Ok(OrderField::Port),
            "cpu_cores" => Ok(OrderField::CpuCores),
            other => Err(AssetError::InvalidInput(format!(
                "cannot order by '{}'",
                other
            ))),
        }
    }
}

/// Ordering clause; `-field` sorts descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub descending: bool,
}

impl Ordering {
    /// Parses `field` or `-field`; returns `None` for unknown fields
    pub fn parse(s: &str) -> Option<Self> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, s),
        };
        name.parse()
            .ok()
            .map(|field| Ordering { field, descending })
    }

    fn compare(&self, a: &Asset, b: &Asset) -> CmpOrdering {
        let ord = match self.field {
            OrderField::Hostname => a.hostname.cmp(&b.hostname),
            OrderField::Ip => a.ip.cmp(&b.ip),
            OrderField::Port => a.port.cmp(&b.port),
            OrderField::CpuCores => a.hardware.cpu_cores.cmp(&b.hardware.cpu_cores),
        };
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Predicate chain over assets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetQuery {
    filters: Vec<AssetFilter>,
    ordering: Option<Ordering>,
}

impl AssetQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate; all predicates must hold
    pub fn filter(mut self, filter: AssetFilter) -> Self {
        // A pass-through node filter restricts nothing
        if let AssetFilter::Node(node_filter) = &filter {
            if node_filter.is_pass_through() {
                return self;
            }
        }
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn filters(&self) -> &[AssetFilter] {
        &self.filters
    }

    /// True when any predicate other than the organization scope is set
    pub fn is_filtered(&self) -> bool {
        self.filters
            .iter()
            .any(|f| !matches!(f, AssetFilter::Org(_)))
    }

    /// Check if every predicate holds for the asset
    pub fn matches(&self, asset: &Asset) -> bool {
        self.filters.iter().all(|f| f.matches(asset))
    }

    /// Applies predicates, drops duplicate ids, then orders
    ///
    /// Without an explicit ordering the input order is kept.
    pub fn apply<I>(&self, assets: I) -> Vec<Asset>
    where
        I: IntoIterator<Item = Asset>,
    {
        let mut seen = HashSet::new();
        let mut result: Vec<Asset> = assets
            .into_iter()
            .filter(|asset| self.matches(asset))
            .filter(|asset| seen.insert(asset.id))
            .collect();

        if let Some(ordering) = &self.ordering {
            result.sort_by(|a, b| ordering.compare(a, b));
        }

        result
    }
}

/// Query-string parameters of the asset listing
///
/// Values arrive as strings; empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetListParams {
    pub node_id: Option<String>,
    pub show_current_asset: Option<String>,
    pub admin_user_id: Option<String>,
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub search: Option<String>,
    /// Comma-separated asset ids
    pub ids: Option<String>,
    /// `name:value`
    pub label: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_id(field: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| AssetError::InvalidInput(format!("{} must be an integer, got '{}'", field, raw)))
}

impl AssetListParams {
    /// `show_current_asset` is on for `1` and `true`
    pub fn show_current_asset(&self) -> bool {
        matches!(self.show_current_asset.as_deref(), Some("1") | Some("true"))
    }

    pub fn node_id(&self) -> Result<Option<NodeId>> {
        non_empty(&self.node_id)
            .map(|raw| parse_id("node_id", raw))
            .transpose()
    }

    pub fn admin_user_id(&self) -> Result<Option<AdminUserId>> {
        non_empty(&self.admin_user_id)
            .map(|raw| parse_id("admin_user_id", raw))
            .transpose()
    }

    pub fn ids(&self) -> Result<Option<BTreeSet<AssetId>>> {
        let Some(raw) = non_empty(&self.ids) else {
            return Ok(None);
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_id("ids", s))
            .collect::<Result<BTreeSet<_>>>()
            .map(Some)
    }

    /// Builds the query for `org`, resolving references through `store`
    ///
    /// Fails with [`AssetError::NotFound`] when `node_id` or
    /// `admin_user_id` names a record that does not exist in `org`.
    pub async fn resolve<S>(&self, store: &S, org: &OrgId) -> Result<AssetQuery>
    where
        S: AssetStore + ?Sized,
    {
        let mut query = AssetQuery::new().filter(AssetFilter::Org(org.clone()));

        if let Some(node_id) = self.node_id()? {
            let node = store
                .get_node(node_id)
                .await?
                .filter(|node| &node.org_id == org)
                .ok_or_else(|| AssetError::not_found("node", node_id))?;
            let nodes = store.list_nodes(org).await?;
            let filter = NodeFilter::resolve(&node, &nodes, self.show_current_asset());
            query = query.filter(AssetFilter::Node(filter));
        }

        if let Some(admin_user_id) = self.admin_user_id()? {
            let admin_user = store
                .get_admin_user(admin_user_id)
                .await?
                .filter(|admin_user| &admin_user.org_id == org)
                .ok_or_else(|| AssetError::not_found("admin user", admin_user_id))?;
            query = query.filter(AssetFilter::AdminUser(admin_user.id));
        }

        if let Some(hostname) = non_empty(&self.hostname) {
            query = query.filter(AssetFilter::Hostname(hostname.to_string()));
        }

        if let Some(ip) = non_empty(&self.ip) {
            query = query.filter(AssetFilter::Ip(ip.to_string()));
        }

        if let Some(term) = non_empty(&self.search) {
            query = query.filter(AssetFilter::Search(term.to_string()));
        }

        if let Some(ids) = self.ids()? {
            query = query.filter(AssetFilter::Ids(ids));
        }

        if let Some(label) = non_empty(&self.label) {
            query = query.filter(AssetFilter::Label(label.parse()?));
        }

        if let Some(ordering) = non_empty(&self.ordering).and_then(Ordering::parse) {
            query = query.order_by(ordering);
        }

        debug!(filters = query.filters().len(), "Built asset query");
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets() -> Vec<Asset> {
        let mut a = Asset::new(1, "web-01", "10.0.0.1").with_admin_user(7);
        a.hardware.cpu_cores = Some(4);
        let mut b = Asset::new(2, "DB-01", "10.0.1.2").with_admin_user(8);
        b.hardware.cpu_cores = Some(16);
        b.port = 2222;
        let c = Asset::new(3, "web-02", "192.168.0.3")
            .with_admin_user(7)
            .with_label(Label::new("env", "prod"));
        vec![a, b, c]
    }

    fn ids(assets: &[Asset]) -> Vec<u64> {
        assets.iter().map(|a| a.id).collect()
    }

    #[test]
    fn test_filters_are_anded() {
        let query = AssetQuery::new()
            .filter(AssetFilter::AdminUser(7))
            .filter(AssetFilter::Search("web".to_string()));
        assert_eq!(ids(&query.apply(assets())), vec![1, 3]);

        let query = query.filter(AssetFilter::Label(Label::new("env", "prod")));
        assert_eq!(ids(&query.apply(assets())), vec![3]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let query = AssetQuery::new().filter(AssetFilter::Search("db".to_string()));
        assert_eq!(ids(&query.apply(assets())), vec![2]);

        let query = AssetQuery::new().filter(AssetFilter::Search("10.0.".to_string()));
        assert_eq!(ids(&query.apply(assets())), vec![1, 2]);
    }

    #[test]
    fn test_search_matches_uppercase_ipv6() {
        let v6 = Asset::new(4, "edge", "FE80::1A2B");
        for term in ["fe80::1a", "FE80::1A", "1a2b"] {
            let query = AssetQuery::new().filter(AssetFilter::Search(term.to_string()));
            assert_eq!(ids(&query.apply(vec![v6.clone()])), vec![4], "term {}", term);
        }
    }

    #[test]
    fn test_ordering() {
        let query = AssetQuery::new().order_by(Ordering::parse("-cpu_cores").unwrap());
        assert_eq!(ids(&query.apply(assets())), vec![2, 1, 3]);

        let query = AssetQuery::new().order_by(Ordering::parse("port").unwrap());
        assert_eq!(ids(&query.apply(assets())), vec![1, 3, 2]);

        assert!(Ordering::parse("memory").is_none());
    }

    #[test]
    fn test_pass_through_node_filter_is_dropped() {
        let query = AssetQuery::new().filter(AssetFilter::Node(NodeFilter::PassThrough));
        assert!(query.filters().is_empty());
        assert!(!query.is_filtered());
    }

    #[test]
    fn test_distinct() {
        let mut input = assets();
        input.push(input[0].clone());
        assert_eq!(AssetQuery::new().apply(input).len(), 3);
    }

    #[test]
    fn test_params_parsing() {
        let params = AssetListParams {
            node_id: Some("12".to_string()),
            show_current_asset: Some("true".to_string()),
            admin_user_id: Some("".to_string()),
            ids: Some("3, 1,,2".to_string()),
            ..Default::default()
        };

        assert_eq!(params.node_id().unwrap(), Some(12));
        assert!(params.show_current_asset());
        assert_eq!(params.admin_user_id().unwrap(), None);
        assert_eq!(
            params.ids().unwrap().unwrap().into_iter().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let params = AssetListParams {
            node_id: Some("abc".to_string()),
            show_current_asset: Some("yes".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.node_id(), Err(AssetError::InvalidInput(_))));
        assert!(!params.show_current_asset());
    }
}
