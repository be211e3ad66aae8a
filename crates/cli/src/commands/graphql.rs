//! GraphQL Commands

use anyhow::{Context, Result};
use clap::Subcommand;
use qakit_client::GraphQLClient;
use qakit_common::EnvironmentConfig;
use serde_json::Value;

use crate::output::{print_error, print_json, OutputFormat};

#[derive(Subcommand)]
pub enum GraphqlCommands {
    /// Run a query and print `data`
    Query {
        /// Query document
        query: String,

        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,

        /// Operation name
        #[arg(long)]
        operation: Option<String>,
    },

    /// Print the schema, if the server allows introspection
    Schema,
}

/// Parse `--variables`; must be a JSON object
pub fn parse_variables(raw: Option<&str>) -> Result<Option<Value>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw).context("--variables is not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("--variables must be a JSON object");
    }
    Ok(Some(value))
}

pub async fn execute(cmd: GraphqlCommands, config: &EnvironmentConfig, _format: OutputFormat) -> Result<()> {
    let client = GraphQLClient::from_env(config)?;

    match cmd {
        GraphqlCommands::Query {
            query,
            variables,
            operation,
        } => {
            let variables = parse_variables(variables.as_deref())?;
            let response = client.query(&query, variables, operation.as_deref()).await?;

            if let Some(data) = &response.data {
                print_json(data);
            }
            if response.has_errors() {
                for message in response.error_messages() {
                    print_error(message);
                }
                std::process::exit(1);
            }
        }

        GraphqlCommands::Schema => match client.introspect().await? {
            Some(schema) => print_json(&schema),
            None => {
                print_error("Introspection is disabled on this server");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
