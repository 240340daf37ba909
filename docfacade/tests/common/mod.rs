use docfacade::{memory::MemoryDriver, prelude::*};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Task {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: None,
        }
    }
}

/// Routes driver and facade logs through the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn manager() -> ConnectionManager<MemoryDriver> {
    init_tracing();

    docfacade::memory::connect("memory://local", "drag", ["batches", "tasks"])
        .await
        .unwrap()
}
