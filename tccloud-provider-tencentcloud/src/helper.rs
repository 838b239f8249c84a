//! Composite identifiers, filter flattening and data source ids

use std::collections::BTreeMap;

use serde::Serialize;
use tccloud_core::provider::ProviderError;

/// Separator of composite identifiers
pub const ID_SEPARATOR: &str = "::";

/// Maximum number of filters in one describe request
pub const MAX_FILTERS: usize = 10;

/// Maximum number of values of one filter
pub const MAX_FILTER_VALUES: usize = 5;

const ATTACHMENT_PREFIX: &str = "att";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HelperError {
    #[error("invalid {kind} id '{id}': {reason}")]
    InvalidId {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("too many filters: {count} (at most {max})")]
    TooManyFilters { count: usize, max: usize },

    #[error("filter '{name}' has {count} values (at most {max})")]
    TooManyFilterValues {
        name: String,
        count: usize,
        max: usize,
    },

    #[error("filter '{name}' has no values")]
    EmptyFilter { name: String },
}

impl From<HelperError> for ProviderError {
    fn from(err: HelperError) -> Self {
        ProviderError::new(err.to_string()).with_cause(err)
    }
}

// =============================================================================
// Route entry ids
// =============================================================================

/// Fields that identify one legacy route entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntryId {
    pub vpc_id: String,
    pub route_table_id: String,
    pub cidr_block: String,
    pub next_type: String,
    pub next_hub: String,
}

pub fn route_id_encode(
    vpc_id: &str,
    route_table_id: &str,
    cidr_block: &str,
    next_type: &str,
    next_hub: &str,
) -> String {
    [vpc_id, route_table_id, cidr_block, next_type, next_hub].join(ID_SEPARATOR)
}

pub fn route_id_decode(id: &str) -> Result<RouteEntryId, HelperError> {
    let invalid = |reason: &str| HelperError::InvalidId {
        kind: "route entry",
        id: id.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = id.split(ID_SEPARATOR).collect();
    if parts.len() != 5 {
        return Err(invalid("expected vpcId::routeTableId::cidrBlock::nextType::nextHub"));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid("empty component"));
    }

    Ok(RouteEntryId {
        vpc_id: parts[0].to_string(),
        route_table_id: parts[1].to_string(),
        cidr_block: parts[2].to_string(),
        next_type: parts[3].to_string(),
        next_hub: parts[4].to_string(),
    })
}

// =============================================================================
// Storage attachment ids
// =============================================================================

pub fn attachment_id(instance_id: &str, storage_id: &str) -> String {
    [ATTACHMENT_PREFIX, instance_id, storage_id].join(ID_SEPARATOR)
}

/// Split `att::<instanceId>::<storageId>` into `(instance_id, storage_id)`
pub fn parse_attachment_id(id: &str) -> Result<(String, String), HelperError> {
    let invalid = |reason: &str| HelperError::InvalidId {
        kind: "storage attachment",
        id: id.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = id.split(ID_SEPARATOR).collect();
    match parts.as_slice() {
        [prefix, instance_id, storage_id] => {
            if *prefix != ATTACHMENT_PREFIX {
                Err(invalid("expected prefix 'att'"))
            } else if instance_id.is_empty() || storage_id.is_empty() {
                Err(invalid("empty component"))
            } else {
                Ok((instance_id.to_string(), storage_id.to_string()))
            }
        }
        _ => Err(invalid("expected att::<instanceId>::<storageId>")),
    }
}

// =============================================================================
// Describe filters
// =============================================================================

/// `{Name, Values}` filter of the v3 describe actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, vec![value.into()])
    }
}

fn check_filters(filters: &[Filter]) -> Result<(), HelperError> {
    if filters.len() > MAX_FILTERS {
        return Err(HelperError::TooManyFilters {
            count: filters.len(),
            max: MAX_FILTERS,
        });
    }
    for filter in filters {
        if filter.values.is_empty() {
            return Err(HelperError::EmptyFilter {
                name: filter.name.clone(),
            });
        }
        if filter.values.len() > MAX_FILTER_VALUES {
            return Err(HelperError::TooManyFilterValues {
                name: filter.name.clone(),
                count: filter.values.len(),
                max: MAX_FILTER_VALUES,
            });
        }
    }
    Ok(())
}

/// Flatten filters into legacy request parameters.
///
/// Writes `Filters.<i>.Name` and `Filters.<i>.Values.<j>` in input order.
/// Nothing is written when a limit is exceeded.
pub fn build_filters_param(
    params: &mut BTreeMap<String, String>,
    filters: &[Filter],
) -> Result<(), HelperError> {
    check_filters(filters)?;
    for (i, filter) in filters.iter().enumerate() {
        params.insert(format!("Filters.{}.Name", i), filter.name.clone());
        for (j, value) in filter.values.iter().enumerate() {
            params.insert(format!("Filters.{}.Values.{}", i, j), value.clone());
        }
    }
    Ok(())
}

/// Filters for a typed request, checked against the same limits
pub fn build_filters_for_sdk(filters: &[Filter]) -> Result<Vec<Filter>, HelperError> {
    check_filters(filters)?;
    Ok(filters.to_vec())
}

// =============================================================================
// Data source ids
// =============================================================================

/// Stable id of a data source result.
///
/// CRC-32 (IEEE) of the sorted ids, each followed by `-`, in decimal.
pub fn data_resource_ids_hash<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut hasher = crc32fast::Hasher::new();
    for id in sorted {
        hasher.update(id.as_bytes());
        hasher.update(b"-");
    }
    hasher.finalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_id_round_trip() {
        let id = route_id_encode("vpc-1", "rtb-1", "10.0.0.0/24", "instance", "10.0.0.5");
        assert_eq!(id, "vpc-1::rtb-1::10.0.0.0/24::instance::10.0.0.5");

        let decoded = route_id_decode(&id).unwrap();
        assert_eq!(decoded.vpc_id, "vpc-1");
        assert_eq!(decoded.route_table_id, "rtb-1");
        assert_eq!(decoded.cidr_block, "10.0.0.0/24");
        assert_eq!(decoded.next_type, "instance");
        assert_eq!(decoded.next_hub, "10.0.0.5");
    }

    #[test]
    fn test_route_id_decode_rejects_malformed() {
        for id in [
            "",
            "vpc-1::rtb-1::10.0.0.0/24::instance",
            "vpc-1::rtb-1::10.0.0.0/24::instance::hub::extra",
            "vpc-1::::10.0.0.0/24::instance::hub",
            "vpc-1:rtb-1:10.0.0.0/24:instance:hub",
        ] {
            assert!(route_id_decode(id).is_err(), "accepted {:?}", id);
        }
    }

    #[test]
    fn test_parse_attachment_id() {
        assert_eq!(attachment_id("ins-1", "disk-1"), "att::ins-1::disk-1");
        assert_eq!(
            parse_attachment_id("att::ins-1::disk-1").unwrap(),
            ("ins-1".to_string(), "disk-1".to_string())
        );
    }

    #[test]
    fn test_parse_attachment_id_rejects_malformed() {
        for id in [
            "ins-1::disk-1",
            "atx::ins-1::disk-1",
            "att::ins-1",
            "att::ins-1::disk-1::x",
            "att::::disk-1",
            "att::ins-1::",
        ] {
            let err = parse_attachment_id(id).unwrap_err();
            assert!(matches!(err, HelperError::InvalidId { .. }), "{}", id);
        }
    }

    #[test]
    fn test_build_filters_param_keys() {
        let filters = vec![
            Filter::new("zone", vec!["ap-guangzhou-3".to_string()]),
            Filter::new(
                "instance-family",
                vec!["S5".to_string(), "SA2".to_string()],
            ),
        ];
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "DescribeInstanceTypeConfigs".to_string());

        build_filters_param(&mut params, &filters).unwrap();

        assert_eq!(params["Filters.0.Name"], "zone");
        assert_eq!(params["Filters.0.Values.0"], "ap-guangzhou-3");
        assert_eq!(params["Filters.1.Name"], "instance-family");
        assert_eq!(params["Filters.1.Values.0"], "S5");
        assert_eq!(params["Filters.1.Values.1"], "SA2");
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn test_build_filters_for_sdk_keeps_order() {
        let filters = vec![
            Filter::single("vpc-id", "vpc-1"),
            Filter::single("vpc-name", "main"),
        ];
        let built = build_filters_for_sdk(&filters).unwrap();
        assert_eq!(built, filters);

        let json = serde_json::to_value(&built[0]).unwrap();
        assert_eq!(json, serde_json::json!({"Name": "vpc-id", "Values": ["vpc-1"]}));
    }

    #[test]
    fn test_filter_limits() {
        let too_many: Vec<Filter> = (0..=MAX_FILTERS)
            .map(|i| Filter::single(format!("f{}", i), "v"))
            .collect();
        assert_eq!(
            build_filters_for_sdk(&too_many).unwrap_err(),
            HelperError::TooManyFilters { count: 11, max: 10 }
        );

        let values: Vec<String> = (0..=MAX_FILTER_VALUES).map(|i| i.to_string()).collect();
        let mut params = BTreeMap::new();
        let err = build_filters_param(&mut params, &[Filter::new("zone", values)]).unwrap_err();
        assert!(matches!(err, HelperError::TooManyFilterValues { count: 6, .. }));
        assert!(params.is_empty());

        assert_eq!(
            build_filters_for_sdk(&[Filter::new("zone", vec![])]).unwrap_err(),
            HelperError::EmptyFilter {
                name: "zone".to_string()
            }
        );
    }

    #[test]
    fn test_data_resource_ids_hash() {
        let a = data_resource_ids_hash(&["vpc-2", "vpc-1", "vpc-3"]);
        let b = data_resource_ids_hash(&["vpc-1", "vpc-3", "vpc-2"]);
        assert_eq!(a, b);
        assert!(a.parse::<u32>().is_ok());

        let c = data_resource_ids_hash(&["vpc-1", "vpc-2"]);
        assert_ne!(a, c);

        let expected = crc32fast::hash(b"vpc-1-vpc-2-vpc-3-").to_string();
        assert_eq!(a, expected);
    }

    #[test]
    fn test_data_resource_ids_hash_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(data_resource_ids_hash(&empty), "0");
    }
}
