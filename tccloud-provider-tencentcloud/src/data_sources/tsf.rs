use serde_json::json;
use tccloud_core::provider::ProviderResult;
use tccloud_core::resource::Resource;

use super::{QueryResult, input};
use crate::TencentCloudProvider;
use crate::services::read_retry;

impl TencentCloudProvider {
    pub(super) async fn query_tsf_applications(&self, resource: &Resource) -> ProviderResult<QueryResult> {
        let application_type = input(resource, "application_type");
        let microservice_type = input(resource, "microservice_type");
        let search_word = input(resource, "search_word");

        let applications = read_retry(|| async move {
            self.tsf()
                .describe_applications(application_type, microservice_type, search_word)
                .await
        })
        .await?;

        let mut result = QueryResult::new("result");
        for app in applications {
            let row = json!({
                "application_id": app.application_id,
                "application_name": app.application_name,
                "application_desc": app.application_desc,
                "application_type": app.application_type,
                "microservice_type": app.microservice_type,
                "application_runtime_type": app.application_runtime_type,
                "program_id": app.program_id,
                "create_time": app.create_time,
                "update_time": app.update_time,
            });
            result.push(app.application_id.clone(), row);
        }
        Ok(result)
    }
}
