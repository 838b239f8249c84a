use std::collections::HashMap;

use tccloud_core::provider::Provider;
use tccloud_core::resource::{Resource, ResourceId, State, Value};
use tccloud_provider_tencentcloud::TencentCloudProvider;
use tccloud_provider_tencentcloud::config::ProviderConfig;
use tccloud_provider_tencentcloud::helper::{attachment_id, route_id_encode};
use tccloud_provider_tencentcloud::services::tcaplus::IdlId;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> TencentCloudProvider {
    let config = ProviderConfig::new("AKIDtest", "secret", "ap-guangzhou").with_endpoint(server.uri());
    TencentCloudProvider::new(config).unwrap()
}

/// Mock answering one v3 action with `{"Response": response}`
fn action(name: &str, response: serde_json::Value) -> Mock {
    Mock::given(method("POST"))
        .and(header("X-TC-Action", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Response": response
        })))
}

fn vendor_error(code: &str) -> serde_json::Value {
    serde_json::json!({
        "Error": {"Code": code, "Message": code},
        "RequestId": "req-err"
    })
}

fn vpc_json(id: &str, name: &str, cidr: &str) -> serde_json::Value {
    serde_json::json!({
        "VpcId": id,
        "VpcName": name,
        "CidrBlock": cidr,
        "IsDefault": false,
        "EnableMulticast": true,
        "DnsServerSet": ["183.60.83.19", "183.60.82.98"],
        "CreatedTime": "2024-01-01 00:00:00",
        "TagSet": [{"Key": "env", "Value": "test"}]
    })
}

#[tokio::test]
async fn test_create_vpc_waits_and_reads_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-TC-Action", "CreateVpc"))
        .and(header("X-TC-Region", "ap-guangzhou"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Response": {
                "Vpc": vpc_json("vpc-abc123", "main", "10.0.0.0/16"),
                "RequestId": "req-1"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-TC-Action", "DescribeVpcs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Response": {
                "TotalCount": 1,
                "VpcSet": [vpc_json("vpc-abc123", "main", "10.0.0.0/16")],
                "RequestId": "req-2"
            }
        })))
        .mount(&server)
        .await;

    let resource = Resource::new("vpc", "main")
        .with_attribute("name", "main")
        .with_attribute("cidr_block", "10.0.0.0/16");

    let state = provider(&server).create(&resource).await.unwrap();

    assert!(state.exists);
    assert_eq!(state.identifier.as_deref(), Some("vpc-abc123"));
    assert_eq!(
        state.attributes.get("cidr_block"),
        Some(&Value::String("10.0.0.0/16".to_string()))
    );
    assert_eq!(state.attributes.get("is_multicast"), Some(&Value::Bool(true)));
    let tags = state.attributes.get("tags").and_then(Value::as_map).unwrap();
    assert_eq!(tags.get("env"), Some(&Value::String("test".to_string())));
}

#[tokio::test]
async fn test_create_surfaces_vendor_error_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CreateVpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Response": {
                "Error": {"Code": "LimitExceeded", "Message": "vpc quota reached"},
                "RequestId": "req-3"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resource = Resource::new("vpc", "main")
        .with_attribute("name", "main")
        .with_attribute("cidr_block", "10.0.0.0/16");

    let err = provider(&server).create(&resource).await.unwrap_err();

    assert_eq!(err.code.as_deref(), Some("LimitExceeded"));
    assert_eq!(err.resource_id, Some(ResourceId::new("vpc", "main")));
}

#[tokio::test]
async fn test_read_missing_vpc_clears_state() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeVpcs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Response": {"TotalCount": 0, "VpcSet": [], "RequestId": "req-4"}
        })))
        .mount(&server)
        .await;

    let id = ResourceId::new("vpc", "main");
    let state = provider(&server).read(&id, Some("vpc-gone")).await.unwrap();

    assert!(!state.exists);
    assert!(state.identifier.is_none());
}

#[tokio::test]
async fn test_read_without_identifier_makes_no_call() {
    let server = MockServer::start().await;

    let id = ResourceId::new("vpc", "main");
    let state = provider(&server).read(&id, None).await.unwrap();

    assert!(!state.exists);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_route_entry_through_legacy_api() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/index.php"))
        .and(body_string_contains("Action=DescribeRouteTable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "message": "",
            "data": [{
                "routeSet": [
                    {"destinationCidrBlock": "0.0.0.0/0", "nextType": 0, "nextHub": "igw-1"},
                    {"destinationCidrBlock": "10.1.0.0/16", "nextType": "9", "nextHub": "ins-1"}
                ]
            }]
        })))
        .mount(&server)
        .await;

    let identifier = route_id_encode("vpc-1", "rtb-1", "10.1.0.0/16", "instance", "ins-1");
    let id = ResourceId::new("route_entry", "to_instance");
    let state = provider(&server).read(&id, Some(&identifier)).await.unwrap();

    assert!(state.exists);
    assert_eq!(state.identifier.as_deref(), Some(identifier.as_str()));
    assert_eq!(
        state.attributes.get("next_type"),
        Some(&Value::String("instance".to_string()))
    );
    assert_eq!(
        state.attributes.get("route_table_id"),
        Some(&Value::String("rtb-1".to_string()))
    );
}

#[tokio::test]
async fn test_legacy_error_envelope_maps_code_desc() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 4000,
            "message": "routeTableId is malformed",
            "codeDesc": "InvalidParameter"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identifier = route_id_encode("vpc-1", "rtb-1", "10.1.0.0/16", "instance", "ins-1");
    let id = ResourceId::new("route_entry", "to_instance");
    let err = provider(&server).read(&id, Some(&identifier)).await.unwrap_err();

    assert_eq!(err.code.as_deref(), Some("InvalidParameter"));
    assert!(err.message.contains("routeTableId is malformed"));
}

#[tokio::test]
async fn test_data_source_writes_result_output_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeVpcs"))
        .and(body_string_contains("vpc-name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Response": {
                "TotalCount": 2,
                "VpcSet": [
                    vpc_json("vpc-1", "web", "10.0.0.0/16"),
                    vpc_json("vpc-2", "web", "10.1.0.0/16")
                ],
                "RequestId": "req-5"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out").join("vpcs.json");
    let resource = Resource::new("vpc_instances", "web")
        .with_attribute("name", "web")
        .with_attribute("result_output_file", output.to_string_lossy().to_string());

    let state = provider(&server).read_data_source(&resource).await.unwrap();

    let list = state.attributes.get("instance_list").and_then(Value::as_list).unwrap();
    assert_eq!(list.len(), 2);
    assert!(state.identifier.is_some());
    assert_eq!(
        state.attributes.get("name"),
        Some(&Value::String("web".to_string()))
    );

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let rows = written.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["vpc_id"], "vpc-2");
}

fn instance_json(name: &str, state: &str) -> serde_json::Value {
    serde_json::json!({
        "InstanceId": "ins-1",
        "InstanceName": name,
        "InstanceType": "S5.SMALL2",
        "InstanceState": state,
        "InstanceChargeType": "POSTPAID_BY_HOUR",
        "Placement": {"Zone": "ap-guangzhou-3", "ProjectId": 0},
        "ImageId": "img-1",
        "PrivateIpAddresses": ["10.0.0.5"],
        "SecurityGroupIds": ["sg-1"],
        "CreatedTime": "2024-01-01T00:00:00Z",
        "Tags": []
    })
}

fn instances(name: &str, state: &str) -> serde_json::Value {
    serde_json::json!({"TotalCount": 1, "InstanceSet": [instance_json(name, state)], "RequestId": "r"})
}

fn instance_declaration(name: &str) -> Resource {
    Resource::new("instance", "web")
        .with_attribute("image_id", "img-1")
        .with_attribute("availability_zone", "ap-guangzhou-3")
        .with_attribute("instance_type", "S5.SMALL2")
        .with_attribute("instance_name", name)
        .with_attribute("security_groups", Value::from(vec!["sg-1".to_string()]))
        .with_attribute("password", "Passw0rd!")
        .with_attribute("hostname", "web-1")
}

#[tokio::test]
async fn test_create_instance_waits_for_running() {
    let server = MockServer::start().await;
    action("RunInstances", serde_json::json!({"InstanceIdSet": ["ins-1"], "RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action("DescribeInstances", instances("web", "RUNNING"))
        .mount(&server)
        .await;

    let state = provider(&server)
        .create(&instance_declaration("web"))
        .await
        .unwrap();

    assert_eq!(state.identifier.as_deref(), Some("ins-1"));
    assert_eq!(state.attributes.get("instance_status"), Some(&Value::from("RUNNING")));
    assert_eq!(state.attributes.get("running_flag"), Some(&Value::Bool(true)));
    assert_eq!(state.attributes.get("password"), Some(&Value::from("Passw0rd!")));
    assert_eq!(state.attributes.get("hostname"), Some(&Value::from("web-1")));
}

#[tokio::test]
async fn test_create_instance_fails_on_launch_failed() {
    let server = MockServer::start().await;
    action("RunInstances", serde_json::json!({"InstanceIdSet": ["ins-1"], "RequestId": "r"}))
        .mount(&server)
        .await;
    action("DescribeInstances", instances("web", "LAUNCH_FAILED"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .create(&instance_declaration("web"))
        .await
        .unwrap_err();

    assert!(err.message.contains("LAUNCH_FAILED"), "{}", err.message);
    assert_eq!(err.resource_id, Some(ResourceId::new("instance", "web")));
}

#[tokio::test]
async fn test_rename_instance_from_read_state_keeps_password() {
    let server = MockServer::start().await;
    action("DescribeInstances", instances("web", "RUNNING"))
        .mount(&server)
        .await;
    action("ModifyInstancesAttribute", serde_json::json!({"RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action("ResetInstancesPassword", serde_json::json!({"RequestId": "r"}))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let id = ResourceId::new("instance", "web");
    let from = provider.read(&id, Some("ins-1")).await.unwrap();
    assert!(!from.attributes.contains_key("password"));

    let state = provider
        .update(&id, "ins-1", &from, &instance_declaration("web-renamed"))
        .await
        .unwrap();

    assert_eq!(state.attributes.get("password"), Some(&Value::from("Passw0rd!")));
    assert_eq!(state.attributes.get("hostname"), Some(&Value::from("web-1")));
}

#[tokio::test]
async fn test_hostname_change_against_saved_state_requires_replacement() {
    let server = MockServer::start().await;

    let id = ResourceId::new("instance", "web");
    let mut attrs = HashMap::new();
    for (key, value) in [
        ("image_id", "img-1"),
        ("availability_zone", "ap-guangzhou-3"),
        ("instance_type", "S5.SMALL2"),
        ("instance_name", "web"),
        ("instance_charge_type", "POSTPAID_BY_HOUR"),
        ("hostname", "web-0"),
    ] {
        attrs.insert(key.to_string(), Value::from(value));
    }
    attrs.insert("project_id".to_string(), Value::Int(0));
    attrs.insert("running_flag".to_string(), Value::Bool(true));
    let from = State::existing(id.clone(), attrs).with_identifier("ins-1");

    let err = provider(&server)
        .update(&id, "ins-1", &from, &instance_declaration("web"))
        .await
        .unwrap_err();

    assert_eq!(err.message, "Changing hostname requires replacement");
    assert!(server.received_requests().await.unwrap().is_empty());
}

fn disk_json(state: &str, size: i64) -> serde_json::Value {
    let attached = state == "ATTACHED";
    let instance_id = if attached { "ins-1" } else { "" };
    serde_json::json!({
        "DiskId": "disk-1",
        "DiskName": "data",
        "DiskType": "CLOUD_PREMIUM",
        "DiskSize": size,
        "DiskState": state,
        "DiskChargeType": "POSTPAID_BY_HOUR",
        "Attached": attached,
        "InstanceId": instance_id,
        "Placement": {"Zone": "ap-guangzhou-3", "ProjectId": 0},
        "Encrypt": false,
        "ThroughputPerformance": 0,
        "Tags": []
    })
}

fn disks(state: &str, size: i64) -> serde_json::Value {
    serde_json::json!({"TotalCount": 1, "DiskSet": [disk_json(state, size)], "RequestId": "r"})
}

fn no_disks() -> serde_json::Value {
    serde_json::json!({"TotalCount": 0, "DiskSet": [], "RequestId": "r"})
}

fn disk_declaration(name: &str, size: i64) -> Resource {
    Resource::new("cbs_storage", "data")
        .with_attribute("storage_type", "CLOUD_PREMIUM")
        .with_attribute("storage_size", size)
        .with_attribute("availability_zone", "ap-guangzhou-3")
        .with_attribute("storage_name", name)
        .with_attribute("snapshot_id", "snap-1")
}

fn disk_state(attrs: &[(&str, Value)]) -> State {
    let attributes = attrs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    State::existing(ResourceId::new("cbs_storage", "data"), attributes).with_identifier("disk-1")
}

#[tokio::test]
async fn test_rename_disk_from_read_state_skips_rollback() {
    let server = MockServer::start().await;
    action("DescribeDisks", disks("UNATTACHED", 50))
        .mount(&server)
        .await;
    action("ModifyDiskAttributes", serde_json::json!({"RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action("ApplySnapshot", serde_json::json!({"RequestId": "r"}))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let id = ResourceId::new("cbs_storage", "data");
    let from = provider.read(&id, Some("disk-1")).await.unwrap();

    let state = provider
        .update(&id, "disk-1", &from, &disk_declaration("data-renamed", 50))
        .await
        .unwrap();

    assert_eq!(state.attributes.get("snapshot_id"), Some(&Value::from("snap-1")));
}

#[tokio::test]
async fn test_resize_disk_waits_for_new_size() {
    let server = MockServer::start().await;
    action("ResizeDisk", serde_json::json!({"RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action("DescribeDisks", disks("EXPANDING", 50))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    action("DescribeDisks", disks("UNATTACHED", 100))
        .mount(&server)
        .await;

    let from = disk_state(&[
        ("storage_type", Value::from("CLOUD_PREMIUM")),
        ("storage_size", Value::Int(50)),
        ("availability_zone", Value::from("ap-guangzhou-3")),
        ("storage_name", Value::from("data")),
        ("charge_type", Value::from("POSTPAID_BY_HOUR")),
        ("project_id", Value::Int(0)),
        ("snapshot_id", Value::from("snap-1")),
    ]);

    let state = provider(&server)
        .update(&from.id, "disk-1", &from, &disk_declaration("data", 100))
        .await
        .unwrap();

    assert_eq!(state.attributes.get("storage_size"), Some(&Value::Int(100)));
}

#[tokio::test]
async fn test_shrinking_disk_is_rejected() {
    let server = MockServer::start().await;

    let from = disk_state(&[
        ("storage_type", Value::from("CLOUD_PREMIUM")),
        ("storage_size", Value::Int(100)),
        ("availability_zone", Value::from("ap-guangzhou-3")),
        ("storage_name", Value::from("data")),
        ("charge_type", Value::from("POSTPAID_BY_HOUR")),
        ("project_id", Value::Int(0)),
    ]);

    let err = provider(&server)
        .update(&from.id, "disk-1", &from, &disk_declaration("data", 50))
        .await
        .unwrap_err();

    assert!(err.message.contains("can only grow"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_force_delete_terminates_recycled_disk_again() {
    let server = MockServer::start().await;
    action("TerminateDisks", serde_json::json!({"RequestId": "r"}))
        .expect(2)
        .mount(&server)
        .await;
    action("DescribeDisks", disks("TORECYCLE", 50))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    action("DescribeDisks", no_disks()).mount(&server).await;

    let from = disk_state(&[("force_delete", Value::Bool(true))]);
    provider(&server)
        .delete(&from.id, "disk-1", &from)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_without_force_leaves_disk_in_recycle_bin() {
    let server = MockServer::start().await;
    action("TerminateDisks", serde_json::json!({"RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action("DescribeDisks", disks("TORECYCLE", 50))
        .mount(&server)
        .await;

    let from = disk_state(&[]);
    provider(&server)
        .delete(&from.id, "disk-1", &from)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_attach_disk_waits_for_attached() {
    let server = MockServer::start().await;
    action("AttachDisks", serde_json::json!({"RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action("DescribeDisks", disks("ATTACHED", 50))
        .mount(&server)
        .await;

    let resource = Resource::new("cbs_storage_attachment", "data")
        .with_attribute("storage_id", "disk-1")
        .with_attribute("instance_id", "ins-1");
    let state = provider(&server).create(&resource).await.unwrap();

    assert_eq!(
        state.identifier.as_deref(),
        Some(attachment_id("ins-1", "disk-1").as_str())
    );
    assert_eq!(state.attributes.get("instance_id"), Some(&Value::from("ins-1")));
}

#[tokio::test]
async fn test_detach_disk_waits_for_unattached() {
    let server = MockServer::start().await;
    action("DetachDisks", serde_json::json!({"RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action("DescribeDisks", disks("UNATTACHED", 50))
        .expect(1)
        .mount(&server)
        .await;

    let id = ResourceId::new("cbs_storage_attachment", "data");
    let identifier = attachment_id("ins-1", "disk-1");
    provider(&server)
        .delete(&id, &identifier, &State::not_found(id.clone()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_snapshot_surfaces_status() {
    let server = MockServer::start().await;
    action("CreateSnapshot", serde_json::json!({"SnapshotId": "snap-1", "RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action(
        "DescribeSnapshots",
        serde_json::json!({
            "TotalCount": 1,
            "SnapshotSet": [{"SnapshotId": "snap-1", "SnapshotState": "FAILED", "DiskId": "disk-1"}],
            "RequestId": "r"
        }),
    )
    .mount(&server)
    .await;

    let resource = Resource::new("cbs_snapshot", "backup")
        .with_attribute("storage_id", "disk-1")
        .with_attribute("snapshot_name", "backup");
    let err = provider(&server).create(&resource).await.unwrap_err();

    assert!(err.message.contains("FAILED"), "{}", err.message);
}

fn idl_id() -> IdlId {
    IdlId {
        app_id: "app-1".to_string(),
        file_name: "tables".to_string(),
        file_type: "PROTO".to_string(),
        file_ext_type: "proto".to_string(),
        file_size: 42,
        file_id: 7,
    }
}

#[tokio::test]
async fn test_create_tcaplus_table_waits_for_task_and_visibility() {
    let server = MockServer::start().await;
    action(
        "CreateTables",
        serde_json::json!({
            "TableResults": [{"TaskId": "task-1", "TableInstanceId": "tcaplus-1"}],
            "RequestId": "r"
        }),
    )
    .expect(1)
    .mount(&server)
    .await;
    action(
        "DescribeTasks",
        serde_json::json!({"TaskInfos": [{"TaskId": "task-1", "Progress": 100}], "RequestId": "r"}),
    )
    .expect(1)
    .mount(&server)
    .await;
    action(
        "DescribeTables",
        serde_json::json!({
            "TotalCount": 1,
            "TableInfos": [{
                "TableName": "players",
                "TableInstanceId": "tcaplus-1",
                "TableType": "GENERIC",
                "TableIdlType": "PROTO",
                "TableGroupId": "1",
                "Status": "AVAILABLE",
                "ReservedReadQps": 1000,
                "ReservedWriteQps": 20,
                "ReservedVolume": 1,
                "IdlFiles": [{"FileName": "tables", "FileType": "PROTO", "FileExtType": "proto", "FileSize": 42, "FileId": 7}]
            }],
            "RequestId": "r"
        }),
    )
    .mount(&server)
    .await;

    let resource = Resource::new("tcaplus_table", "players")
        .with_attribute("app_id", "app-1")
        .with_attribute("zone_id", "app-1:1")
        .with_attribute("table_name", "players")
        .with_attribute("table_type", "GENERIC")
        .with_attribute("idl_id", idl_id().encode().unwrap())
        .with_attribute("table_idl_type", "PROTO")
        .with_attribute("reserved_read_qps", 1000i64)
        .with_attribute("reserved_write_qps", 20i64)
        .with_attribute("reserved_volume", 1i64);
    let state = provider(&server).create(&resource).await.unwrap();

    assert_eq!(state.identifier.as_deref(), Some("app-1:tcaplus-1"));
    assert_eq!(state.attributes.get("zone_id"), Some(&Value::from("app-1:1")));
    assert_eq!(
        state.attributes.get("idl_id"),
        Some(&Value::from(idl_id().encode().unwrap()))
    );
}

#[tokio::test]
async fn test_update_tcaplus_idl_from_read_state_is_not_a_replacement() {
    let server = MockServer::start().await;
    action(
        "VerifyIdlFiles",
        serde_json::json!({
            "TableInfos": [{"TableName": "players", "TableIdlType": "PROTO", "TableType": "GENERIC"}],
            "RequestId": "r"
        }),
    )
    .mount(&server)
    .await;

    let provider = provider(&server);
    let id = ResourceId::new("tcaplus_idl", "tables");
    let identifier = idl_id().encode().unwrap();
    let from = provider.read(&id, Some(&identifier)).await.unwrap();

    let to = Resource::new("tcaplus_idl", "tables")
        .with_attribute("app_id", "app-1")
        .with_attribute("zone_id", "app-1:1")
        .with_attribute("file_name", "tables")
        .with_attribute("file_type", "PROTO")
        .with_attribute("file_ext_type", "proto")
        .with_attribute("file_content", "syntax = \"proto3\";");
    let state = provider.update(&id, &identifier, &from, &to).await.unwrap();

    assert_eq!(state.attributes.get("zone_id"), Some(&Value::from("app-1:1")));
}

#[tokio::test]
async fn test_rename_tcaplus_application_keeps_password() {
    let server = MockServer::start().await;
    action(
        "DescribeClusters",
        serde_json::json!({
            "TotalCount": 1,
            "Clusters": [{
                "ClusterId": "app-1",
                "ClusterName": "game",
                "IdlType": "PROTO",
                "VpcId": "vpc-1",
                "SubnetId": "subnet-1"
            }],
            "RequestId": "r"
        }),
    )
    .mount(&server)
    .await;
    action("ModifyClusterName", serde_json::json!({"RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action("ModifyClusterPassword", serde_json::json!({"RequestId": "r"}))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let id = ResourceId::new("tcaplus_application", "game");
    let from = provider.read(&id, Some("app-1")).await.unwrap();

    let to = Resource::new("tcaplus_application", "game")
        .with_attribute("idl_type", "PROTO")
        .with_attribute("app_name", "game-2")
        .with_attribute("vpc_id", "vpc-1")
        .with_attribute("subnet_id", "subnet-1")
        .with_attribute("password", "Secret123");
    provider.update(&id, "app-1", &from, &to).await.unwrap();
}

#[tokio::test]
async fn test_bind_api_group_uses_pair_id() {
    let server = MockServer::start().await;
    action("BindApiGroup", serde_json::json!({"Result": true, "RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;
    action(
        "DescribeGroupBindedGateways",
        serde_json::json!({
            "Result": {"TotalCount": 1, "Content": [{"DeployGroupId": "group-gw"}]},
            "RequestId": "r"
        }),
    )
    .mount(&server)
    .await;

    let resource = Resource::new("tsf_bind_api_group", "bind")
        .with_attribute("group_id", "grp-1")
        .with_attribute("gateway_deploy_group_id", "group-gw");
    let state = provider(&server).create(&resource).await.unwrap();

    assert_eq!(state.identifier.as_deref(), Some("grp-1#group-gw"));
    assert_eq!(state.attributes.get("group_id"), Some(&Value::from("grp-1")));
}

#[tokio::test]
async fn test_read_rejects_malformed_pair_id() {
    let server = MockServer::start().await;

    let id = ResourceId::new("tsf_bind_api_group", "bind");
    let err = provider(&server).read(&id, Some("grp-1")).await.unwrap_err();

    assert_eq!(err.resource_id, Some(id));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_application_config_from_read_state_is_not_a_replacement() {
    let server = MockServer::start().await;
    action(
        "DescribeConfigs",
        serde_json::json!({
            "Result": {"TotalCount": 1, "Content": [{
                "ConfigId": "dcfg-1",
                "ConfigName": "app",
                "ConfigVersion": "1.0",
                "ConfigValue": "a: 1",
                "ApplicationId": "application-1"
            }]},
            "RequestId": "r"
        }),
    )
    .mount(&server)
    .await;

    let provider = provider(&server);
    let id = ResourceId::new("tsf_application_config", "app");
    let from = provider.read(&id, Some("dcfg-1")).await.unwrap();

    let to = Resource::new("tsf_application_config", "app")
        .with_attribute("config_name", "app")
        .with_attribute("config_version", "1.0")
        .with_attribute("config_value", "a: 1")
        .with_attribute("application_id", "application-1")
        .with_attribute("encode_with_base64", true);
    let state = provider.update(&id, "dcfg-1", &from, &to).await.unwrap();

    assert_eq!(state.attributes.get("encode_with_base64"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn test_delete_security_group_retries_while_in_use() {
    let server = MockServer::start().await;
    action("DeleteSecurityGroup", vendor_error("ResourceInUse"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    action("DeleteSecurityGroup", serde_json::json!({"RequestId": "r"}))
        .expect(1)
        .mount(&server)
        .await;

    let id = ResourceId::new("security_group", "web");
    provider(&server)
        .delete(&id, "sg-1", &State::not_found(id.clone()))
        .await
        .unwrap();
}
