/// DynamoDB implementation of [`StoreClient`]

use crate::convert::{
    attribute_definitions, billing_mode, from_sdk_capacity, from_sdk_item,
    from_table_description, invalid_request, key_schema, local_indexes, projection, table_class,
    throughput, throughput_update, to_sdk_value,
};
use crate::error::store_error;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types as sdk;
use aws_sdk_dynamodb::Client;
use dynoql_core::schema::{
    AlterGsiRequest, AlterTableRequest, CreateGsiRequest, CreateTableRequest, DropGsiRequest,
    TableDescriptor,
};
use dynoql_core::store::{
    ExecuteStatementOutput, ExecuteStatementRequest, ExecuteTransactionOutput, ItemResponse,
    ParameterizedStatement, ResponseMetadata, StoreClient, StoreResult,
};
use dynoql_core::{DriverConfig, Error, Result, StoreError};
use tracing::{debug, info};

/// Store client backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Builds an SDK client from `config`.
    ///
    /// Unset region and credentials fall back to the SDK's default provider
    /// chain.
    pub async fn connect(config: &DriverConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(creds) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "dynoql",
            ));
        }
        let sdk_config = loader.load().await;

        info!(
            region = config.region.as_deref().unwrap_or("default"),
            endpoint = config.endpoint.as_deref().unwrap_or("default"),
            "store client ready"
        );
        Ok(Self::from_client(Client::new(&sdk_config)))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn sdk_client(&self) -> &Client {
        &self.client
    }
}

fn metadata(request_id: Option<&str>) -> ResponseMetadata {
    ResponseMetadata {
        request_id: request_id.map(String::from),
        ..Default::default()
    }
}

#[async_trait]
impl StoreClient for DynamoStore {
    async fn execute_statement(
        &self,
        request: ExecuteStatementRequest,
    ) -> StoreResult<ExecuteStatementOutput> {
        debug!(statement = %request.statement, params = request.parameters.len(), "execute statement");
        let parameters = (!request.parameters.is_empty())
            .then(|| request.parameters.iter().map(to_sdk_value).collect());

        let out = self
            .client
            .execute_statement()
            .statement(request.statement)
            .set_parameters(parameters)
            .set_limit(request.limit)
            .set_consistent_read(request.consistent_read)
            .set_next_token(request.next_token)
            .return_consumed_capacity(sdk::ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(store_error)?;

        Ok(ExecuteStatementOutput {
            items: out
                .items()
                .iter()
                .map(from_sdk_item)
                .collect::<StoreResult<Vec<_>>>()?,
            next_token: out.next_token().map(String::from),
            last_evaluated_key: out.last_evaluated_key().map(from_sdk_item).transpose()?,
            consumed_capacity: out.consumed_capacity().map(from_sdk_capacity),
            metadata: metadata(out.request_id()),
        })
    }

    async fn execute_transaction(
        &self,
        statements: Vec<ParameterizedStatement>,
    ) -> StoreResult<ExecuteTransactionOutput> {
        debug!(statements = statements.len(), "execute transaction");
        let transact = statements
            .into_iter()
            .map(|s| {
                let parameters = (!s.parameters.is_empty())
                    .then(|| s.parameters.iter().map(to_sdk_value).collect());
                sdk::ParameterizedStatement::builder()
                    .statement(s.statement)
                    .set_parameters(parameters)
                    .build()
                    .map_err(invalid_request)
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let out = self
            .client
            .execute_transaction()
            .set_transact_statements(Some(transact))
            .return_consumed_capacity(sdk::ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(store_error)?;

        Ok(ExecuteTransactionOutput {
            responses: out
                .responses()
                .iter()
                .map(|r| {
                    Ok(ItemResponse {
                        item: r.item().map(from_sdk_item).transpose()?,
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?,
            consumed_capacity: out.consumed_capacity().iter().map(from_sdk_capacity).collect(),
            metadata: metadata(out.request_id()),
        })
    }

    async fn create_table(&self, request: CreateTableRequest) -> StoreResult<()> {
        self.client
            .create_table()
            .table_name(&request.table_name)
            .set_attribute_definitions(Some(attribute_definitions(&request.attribute_definitions)?))
            .set_key_schema(Some(key_schema(&request.key_schema)?))
            .set_local_secondary_indexes(local_indexes(&request.local_secondary_indexes)?)
            .billing_mode(billing_mode(request.billing_mode))
            .set_provisioned_throughput(request.provisioned_throughput.as_ref().map(throughput).transpose()?)
            .set_table_class(request.table_class.map(table_class))
            .send()
            .await
            .map_err(store_error)?;
        info!(table = %request.table_name, "table created");
        Ok(())
    }

    async fn alter_table(&self, request: AlterTableRequest) -> StoreResult<()> {
        self.client
            .update_table()
            .table_name(&request.table_name)
            .set_billing_mode(request.billing_mode.map(billing_mode))
            .set_provisioned_throughput(
                request.provisioned_throughput.as_ref().map(throughput_update).transpose()?,
            )
            .set_table_class(request.table_class.map(table_class))
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn drop_table(&self, table_name: &str) -> StoreResult<()> {
        self.client
            .delete_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(store_error)?;
        info!(table = table_name, "table dropped");
        Ok(())
    }

    async fn describe_table(&self, table_name: &str) -> StoreResult<TableDescriptor> {
        let out = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(store_error)?;
        out.table()
            .map(from_table_description)
            .ok_or_else(|| StoreError::ResourceNotFound(format!("table {} not found", table_name)))
    }

    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let out = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(store_error)?;
            names.extend(out.table_names().iter().cloned());
            match out.last_evaluated_table_name() {
                Some(last) => start = Some(last.to_string()),
                None => return Ok(names),
            }
        }
    }

    async fn create_index(&self, request: CreateGsiRequest) -> StoreResult<()> {
        let action = sdk::CreateGlobalSecondaryIndexAction::builder()
            .index_name(&request.index_name)
            .set_key_schema(Some(key_schema(&request.key_schema)?))
            .projection(projection(&request.projection))
            .set_provisioned_throughput(request.provisioned_throughput.as_ref().map(throughput).transpose()?)
            .build()
            .map_err(invalid_request)?;

        self.client
            .update_table()
            .table_name(&request.table_name)
            .set_attribute_definitions(Some(attribute_definitions(&request.attribute_definitions)?))
            .global_secondary_index_updates(
                sdk::GlobalSecondaryIndexUpdate::builder().create(action).build(),
            )
            .send()
            .await
            .map_err(store_error)?;
        info!(table = %request.table_name, index = %request.index_name, "index created");
        Ok(())
    }

    async fn alter_index(&self, request: AlterGsiRequest) -> StoreResult<()> {
        let action = sdk::UpdateGlobalSecondaryIndexAction::builder()
            .index_name(&request.index_name)
            .provisioned_throughput(throughput(&request.provisioned_throughput)?)
            .build()
            .map_err(invalid_request)?;

        self.client
            .update_table()
            .table_name(&request.table_name)
            .global_secondary_index_updates(
                sdk::GlobalSecondaryIndexUpdate::builder().update(action).build(),
            )
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn drop_index(&self, request: DropGsiRequest) -> StoreResult<()> {
        let action = sdk::DeleteGlobalSecondaryIndexAction::builder()
            .index_name(&request.index_name)
            .build()
            .map_err(invalid_request)?;

        self.client
            .update_table()
            .table_name(&request.table_name)
            .global_secondary_index_updates(
                sdk::GlobalSecondaryIndexUpdate::builder().delete(action).build(),
            )
            .send()
            .await
            .map_err(store_error)?;
        info!(table = %request.table_name, index = %request.index_name, "index dropped");
        Ok(())
    }
}
