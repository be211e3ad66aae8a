//! Objects Commands

use anyhow::{bail, Result};
use clap::Subcommand;
use qakit_client::{DeviceObject, ObjectsService};
use qakit_common::EnvironmentConfig;
use serde::Serialize;

use crate::output::{print_item, print_list, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum ObjectsCommands {
    /// List objects, optionally only the given ids
    List {
        /// Object IDs (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,
    },

    /// Get object details
    Get {
        /// Object ID
        id: String,
    },
}

/// Object display wrapper for serialization
#[derive(Serialize)]
pub struct ObjectDisplay {
    pub id: String,
    pub name: String,
    pub data: String,
}

impl From<DeviceObject> for ObjectDisplay {
    fn from(object: DeviceObject) -> Self {
        Self {
            id: object.id.unwrap_or_default(),
            name: object.name,
            data: object.data.map(|d| d.to_string()).unwrap_or_default(),
        }
    }
}

impl TableDisplay for ObjectDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "Data"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.id.clone(), self.name.clone(), self.data.clone()]
    }
}

pub async fn execute(cmd: ObjectsCommands, config: &EnvironmentConfig, format: OutputFormat) -> Result<()> {
    let service = ObjectsService::from_env(config)?;

    match cmd {
        ObjectsCommands::List { ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            let response = service.list_objects(&ids).await?;
            if !response.is_success() {
                bail!("Listing objects failed with status {}", response.status_code());
            }
            let objects: Vec<DeviceObject> = response.json()?;
            let displays: Vec<ObjectDisplay> = objects.into_iter().map(ObjectDisplay::from).collect();
            print_list(&displays, format);
        }

        ObjectsCommands::Get { id } => {
            let response = service.get_object_by_id(&id).await?;
            if response.status_code() == 404 {
                bail!("Object {} not found", id);
            }
            if !response.is_success() {
                bail!("Fetching object failed with status {}", response.status_code());
            }
            let object: DeviceObject = response.json()?;
            print_item(&ObjectDisplay::from(object), format);
        }
    }

    Ok(())
}
