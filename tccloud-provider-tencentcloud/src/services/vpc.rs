//! VPC actions: networks, subnets, route tables, security groups and the
//! legacy route entry API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Ack, Tag, paginate};
use crate::connectivity::{TencentCloudClient, decode_legacy};
use crate::error::ApiError;
use crate::helper::Filter;

const SERVICE: &str = "vpc";
const VERSION: &str = "2017-03-12";
pub const PAGE_LIMIT: u64 = 100;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Vpc {
    pub vpc_id: String,
    pub vpc_name: String,
    pub cidr_block: String,
    pub is_default: bool,
    pub enable_multicast: bool,
    pub dns_server_set: Vec<String>,
    pub created_time: String,
    pub tag_set: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Subnet {
    pub vpc_id: String,
    pub subnet_id: String,
    pub subnet_name: String,
    pub cidr_block: String,
    pub is_default: bool,
    pub enable_broadcast: bool,
    pub zone: String,
    pub route_table_id: String,
    pub available_ip_address_count: i64,
    pub created_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RouteTableAssociation {
    pub subnet_id: String,
    pub route_table_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Route {
    pub route_id: u64,
    pub destination_cidr_block: String,
    pub gateway_type: String,
    pub gateway_id: String,
    pub route_description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RouteTable {
    pub vpc_id: String,
    pub route_table_id: String,
    pub route_table_name: String,
    pub association_set: Vec<RouteTableAssociation>,
    pub route_set: Vec<Route>,
    pub main: bool,
    pub created_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SecurityGroup {
    pub security_group_id: String,
    pub security_group_name: String,
    pub security_group_desc: String,
    pub project_id: String,
    pub is_default: bool,
    pub created_time: String,
    pub tag_set: Vec<Tag>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    vpc_ids: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subnet_ids: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route_table_ids: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_group_ids: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "<[Filter]>::is_empty")]
    filters: &'a [Filter],
    /// The VPC describes take paging values as strings
    offset: String,
    limit: String,
}

impl<'a> DescribeRequest<'a> {
    fn page(filters: &'a [Filter], offset: u64, limit: u64) -> Self {
        Self {
            vpc_ids: None,
            subnet_ids: None,
            route_table_ids: None,
            security_group_ids: None,
            filters,
            offset: offset.to_string(),
            limit: limit.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVpcsResponse {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    vpc_set: Vec<Vpc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSubnetsResponse {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    subnet_set: Vec<Subnet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeRouteTablesResponse {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    route_table_set: Vec<RouteTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroupsResponse {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    security_group_set: Vec<SecurityGroup>,
}

/// Arguments of `CreateVpc` and `ModifyVpcAttribute`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    pub vpc_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    /// "true" or "false"
    pub enable_multicast: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Arguments of `CreateSubnet`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetSpec {
    pub vpc_id: String,
    pub subnet_name: String,
    pub cidr_block: String,
    pub zone: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Arguments of `CreateSecurityGroup`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupSpec {
    pub group_name: String,
    pub group_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

// =============================================================================
// Legacy route entries
// =============================================================================

/// Next hop kinds of a legacy route entry, with their wire codes
pub const ROUTE_NEXT_TYPES: &[(&str, i64)] = &[
    ("public_gateway", 0),
    ("vpn_gateway", 1),
    ("dc_gateway", 3),
    ("peering_connection", 4),
    ("sslvpn_gateway", 7),
    ("nat_gateway", 8),
    ("instance", 9),
];

pub fn route_next_type_code(name: &str) -> Option<i64> {
    ROUTE_NEXT_TYPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

pub fn route_next_type_name(code: i64) -> Option<&'static str> {
    ROUTE_NEXT_TYPES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

/// One entry of a legacy route table
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyRoute {
    pub destination_cidr_block: String,
    pub next_type: i64,
    pub next_hub: String,
}

fn json_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_str(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Service
// =============================================================================

pub struct VpcService<'a> {
    client: &'a TencentCloudClient,
}

impl<'a> VpcService<'a> {
    pub fn new(client: &'a TencentCloudClient) -> Self {
        Self { client }
    }

    // ---- VPC ----

    pub async fn create_vpc(&self, spec: &VpcSpec) -> Result<Vpc, ApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            vpc: Vpc,
        }
        let resp: Resp = self.client.call(SERVICE, VERSION, "CreateVpc", spec).await?;
        Ok(resp.vpc)
    }

    pub async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<Vpc>, ApiError> {
        let mut req = DescribeRequest::page(&[], 0, PAGE_LIMIT);
        req.vpc_ids = Some(vec![vpc_id]);
        let resp: DescribeVpcsResponse =
            self.client.call(SERVICE, VERSION, "DescribeVpcs", &req).await?;
        Ok(resp.vpc_set.into_iter().find(|v| v.vpc_id == vpc_id))
    }

    pub async fn describe_vpcs(&self, filters: &[Filter]) -> Result<Vec<Vpc>, ApiError> {
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = DescribeRequest::page(filters, offset, limit);
            let resp: DescribeVpcsResponse =
                self.client.call(SERVICE, VERSION, "DescribeVpcs", &req).await?;
            Ok((resp.vpc_set, resp.total_count))
        })
        .await
    }

    pub async fn modify_vpc_attribute(&self, spec: &VpcSpec) -> Result<(), ApiError> {
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyVpcAttribute", spec)
            .await?;
        Ok(())
    }

    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            vpc_id: &'a str,
        }
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "DeleteVpc", &Req { vpc_id })
            .await?;
        Ok(())
    }

    // ---- Subnet ----

    pub async fn create_subnet(&self, spec: &SubnetSpec) -> Result<Subnet, ApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            subnet: Subnet,
        }
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "CreateSubnet", spec)
            .await?;
        Ok(resp.subnet)
    }

    pub async fn describe_subnet(&self, subnet_id: &str) -> Result<Option<Subnet>, ApiError> {
        let mut req = DescribeRequest::page(&[], 0, PAGE_LIMIT);
        req.subnet_ids = Some(vec![subnet_id]);
        let resp: DescribeSubnetsResponse = self
            .client
            .call(SERVICE, VERSION, "DescribeSubnets", &req)
            .await?;
        Ok(resp.subnet_set.into_iter().find(|s| s.subnet_id == subnet_id))
    }

    pub async fn describe_subnets(&self, filters: &[Filter]) -> Result<Vec<Subnet>, ApiError> {
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = DescribeRequest::page(filters, offset, limit);
            let resp: DescribeSubnetsResponse = self
                .client
                .call(SERVICE, VERSION, "DescribeSubnets", &req)
                .await?;
            Ok((resp.subnet_set, resp.total_count))
        })
        .await
    }

    pub async fn modify_subnet_attribute(
        &self,
        subnet_id: &str,
        name: &str,
        enable_broadcast: bool,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            subnet_id: &'a str,
            subnet_name: &'a str,
            enable_broadcast: String,
        }
        let req = Req {
            subnet_id,
            subnet_name: name,
            enable_broadcast: enable_broadcast.to_string(),
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifySubnetAttribute", &req)
            .await?;
        Ok(())
    }

    pub async fn replace_route_table_association(
        &self,
        subnet_id: &str,
        route_table_id: &str,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            subnet_id: &'a str,
            route_table_id: &'a str,
        }
        let req = Req {
            subnet_id,
            route_table_id,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ReplaceRouteTableAssociation", &req)
            .await?;
        Ok(())
    }

    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            subnet_id: &'a str,
        }
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "DeleteSubnet", &Req { subnet_id })
            .await?;
        Ok(())
    }

    // ---- Route table ----

    pub async fn create_route_table(&self, vpc_id: &str, name: &str) -> Result<String, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            vpc_id: &'a str,
            route_table_name: &'a str,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            route_table: RouteTable,
        }
        let req = Req {
            vpc_id,
            route_table_name: name,
        };
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "CreateRouteTable", &req)
            .await?;
        Ok(resp.route_table.route_table_id)
    }

    pub async fn describe_route_table(
        &self,
        route_table_id: &str,
    ) -> Result<Option<RouteTable>, ApiError> {
        let mut req = DescribeRequest::page(&[], 0, PAGE_LIMIT);
        req.route_table_ids = Some(vec![route_table_id]);
        let resp: DescribeRouteTablesResponse = self
            .client
            .call(SERVICE, VERSION, "DescribeRouteTables", &req)
            .await?;
        Ok(resp
            .route_table_set
            .into_iter()
            .find(|t| t.route_table_id == route_table_id))
    }

    pub async fn describe_route_tables(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<RouteTable>, ApiError> {
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = DescribeRequest::page(filters, offset, limit);
            let resp: DescribeRouteTablesResponse = self
                .client
                .call(SERVICE, VERSION, "DescribeRouteTables", &req)
                .await?;
            Ok((resp.route_table_set, resp.total_count))
        })
        .await
    }

    pub async fn modify_route_table_attribute(
        &self,
        route_table_id: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            route_table_id: &'a str,
            route_table_name: &'a str,
        }
        let req = Req {
            route_table_id,
            route_table_name: name,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyRouteTableAttribute", &req)
            .await?;
        Ok(())
    }

    pub async fn delete_route_table(&self, route_table_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            route_table_id: &'a str,
        }
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "DeleteRouteTable", &Req { route_table_id })
            .await?;
        Ok(())
    }

    // ---- Security group ----

    pub async fn create_security_group(
        &self,
        spec: &SecurityGroupSpec,
    ) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Resp {
            security_group: SecurityGroup,
        }
        let resp: Resp = self
            .client
            .call(SERVICE, VERSION, "CreateSecurityGroup", spec)
            .await?;
        if resp.security_group.security_group_id.is_empty() {
            return Err(ApiError::EmptyResponse("CreateSecurityGroup".to_string()));
        }
        Ok(resp.security_group.security_group_id)
    }

    pub async fn describe_security_group(
        &self,
        security_group_id: &str,
    ) -> Result<Option<SecurityGroup>, ApiError> {
        let mut req = DescribeRequest::page(&[], 0, PAGE_LIMIT);
        req.security_group_ids = Some(vec![security_group_id]);
        let resp: DescribeSecurityGroupsResponse = self
            .client
            .call(SERVICE, VERSION, "DescribeSecurityGroups", &req)
            .await?;
        Ok(resp
            .security_group_set
            .into_iter()
            .find(|g| g.security_group_id == security_group_id))
    }

    pub async fn describe_security_groups(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<SecurityGroup>, ApiError> {
        paginate(PAGE_LIMIT, |offset, limit| async move {
            let req = DescribeRequest::page(filters, offset, limit);
            let resp: DescribeSecurityGroupsResponse = self
                .client
                .call(SERVICE, VERSION, "DescribeSecurityGroups", &req)
                .await?;
            Ok((resp.security_group_set, resp.total_count))
        })
        .await
    }

    pub async fn modify_security_group_attribute(
        &self,
        security_group_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            security_group_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            group_name: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            group_description: Option<&'a str>,
        }
        let req = Req {
            security_group_id,
            group_name: name,
            group_description: description,
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifySecurityGroupAttribute", &req)
            .await?;
        Ok(())
    }

    pub async fn delete_security_group(&self, security_group_id: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Req<'a> {
            security_group_id: &'a str,
        }
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "DeleteSecurityGroup", &Req { security_group_id })
            .await?;
        Ok(())
    }

    // ---- Legacy route entries ----

    fn route_params(
        action: &str,
        vpc_id: &str,
        route_table_id: &str,
        route: &LegacyRoute,
    ) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), action.to_string());
        params.insert("vpcId".to_string(), vpc_id.to_string());
        params.insert("routeTableId".to_string(), route_table_id.to_string());
        params.insert(
            "routeSet.0.destinationCidrBlock".to_string(),
            route.destination_cidr_block.clone(),
        );
        params.insert("routeSet.0.nextType".to_string(), route.next_type.to_string());
        params.insert("routeSet.0.nextHub".to_string(), route.next_hub.clone());
        params
    }

    pub async fn create_route(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        route: &LegacyRoute,
    ) -> Result<(), ApiError> {
        let params = Self::route_params("CreateRoute", vpc_id, route_table_id, route);
        let body = self.client.send_request(SERVICE, params).await?;
        decode_legacy("CreateRoute", &body)?;
        Ok(())
    }

    pub async fn delete_route(
        &self,
        vpc_id: &str,
        route_table_id: &str,
        route: &LegacyRoute,
    ) -> Result<(), ApiError> {
        let params = Self::route_params("DeleteRoute", vpc_id, route_table_id, route);
        let body = self.client.send_request(SERVICE, params).await?;
        decode_legacy("DeleteRoute", &body)?;
        Ok(())
    }

    /// Route entries of one table through the legacy `DescribeRouteTable`
    pub async fn describe_legacy_routes(
        &self,
        vpc_id: &str,
        route_table_id: &str,
    ) -> Result<Option<Vec<LegacyRoute>>, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), "DescribeRouteTable".to_string());
        params.insert("vpcId".to_string(), vpc_id.to_string());
        params.insert("routeTableId".to_string(), route_table_id.to_string());

        let body = self.client.send_request(SERVICE, params).await?;
        let value = decode_legacy("DescribeRouteTable", &body)?;

        let Some(table) = value
            .get("data")
            .and_then(|d| d.as_array())
            .and_then(|tables| tables.first())
        else {
            return Ok(None);
        };

        let routes = table
            .get("routeSet")
            .and_then(|r| r.as_array())
            .map(|routes| {
                routes
                    .iter()
                    .map(|r| LegacyRoute {
                        destination_cidr_block: json_str(r, "destinationCidrBlock"),
                        next_type: r.get("nextType").and_then(json_i64).unwrap_or(-1),
                        next_hub: json_str(r, "nextHub"),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(routes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_type_codes() {
        assert_eq!(route_next_type_code("public_gateway"), Some(0));
        assert_eq!(route_next_type_code("instance"), Some(9));
        assert_eq!(route_next_type_code("unknown"), None);
        assert_eq!(route_next_type_name(8), Some("nat_gateway"));
        assert_eq!(route_next_type_name(2), None);
    }

    #[test]
    fn test_describe_request_omits_unset_fields() {
        let filters = vec![Filter::single("vpc-id", "vpc-1")];
        let req = DescribeRequest::page(&filters, 100, 100);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Filters": [{"Name": "vpc-id", "Values": ["vpc-1"]}],
                "Offset": "100",
                "Limit": "100"
            })
        );
    }

    #[test]
    fn test_legacy_route_params() {
        let route = LegacyRoute {
            destination_cidr_block: "10.1.0.0/16".to_string(),
            next_type: 9,
            next_hub: "10.0.0.5".to_string(),
        };
        let params = VpcService::route_params("CreateRoute", "vpc-1", "rtb-1", &route);
        assert_eq!(params["Action"], "CreateRoute");
        assert_eq!(params["routeSet.0.nextType"], "9");
        assert_eq!(params["routeSet.0.destinationCidrBlock"], "10.1.0.0/16");
    }

    #[test]
    fn test_vpc_decodes_with_missing_fields() {
        let vpc: Vpc = serde_json::from_value(serde_json::json!({
            "VpcId": "vpc-1",
            "VpcName": "main",
            "CidrBlock": "10.0.0.0/16"
        }))
        .unwrap();
        assert_eq!(vpc.vpc_id, "vpc-1");
        assert!(vpc.dns_server_set.is_empty());
        assert!(!vpc.is_default);
    }
}
