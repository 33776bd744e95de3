/*!
# Formflow-rs

Schema-driven connector configuration forms and async backend task polling for data-platform tooling.

## Overview

Formflow-rs covers the two pieces of a data-platform admin client that carry real logic:

* **Connector forms**: a connector specification (a JSON-Schema-like document with `properties`,
  `oneOf`, `enum` and the `airbyte_secret`/`airbyte_hidden` extension keys) is compiled into a tree of
  typed field descriptors. A form binds that tree to a configuration object, applies typed edits that keep
  the object consistent with the schema, renders the visible controls and validates on submit.
* **Task polling**: long-running backend jobs return a task id. The poller fetches the task status at a
  fixed interval until the latest progress entry is terminal, and supports cancellation, attempt ceilings
  and deadlines.

## Key Components

* **SpecCompiler**: Turns a connector specification into `FieldDescriptor`s
* **ConnectorForm**: Descriptors plus live state, with edit, render and submit operations
* **FieldPath**: Location of a field in the configuration object, with an item placeholder for list items
* **TaskBackend**: The submit/status operations the poller needs, implemented over HTTP by `HttpTaskClient`
* **TaskPoller**: Sequential fetch/sleep chain with cancellation and optional limits

## Connector Form Example

```rust,no_run
use formflow_rs::{ConnectorForm, FieldPath, Result};
use serde_json::json;

fn main() -> Result<()> {
    let spec = json!({
        "connectionSpecification": {
            "required": ["host", "storage"],
            "properties": {
                "host": {"type": "string", "order": 0},
                "password": {"type": "string", "airbyte_secret": true, "order": 1},
                "storage": {
                    "type": "object",
                    "order": 2,
                    "oneOf": [
                        {"title": "AWS", "properties": {
                            "provider": {"const": "aws"},
                            "bucket": {"type": "string"}
                        }},
                        {"title": "GCS", "properties": {
                            "provider": {"const": "gcs"},
                            "project": {"type": "string"}
                        }}
                    ]
                }
            }
        }
    });

    let mut form = ConnectorForm::from_spec(&spec)?;
    form.set_text(&FieldPath::parse("host"), "db.internal")?;
    form.select_const(&FieldPath::parse("storage"), json!("gcs"))?;
    form.set_text(&FieldPath::parse("storage.project"), "analytics")?;

    for control in form.render() {
        println!("{}: {:?}", control.label, control.widget);
    }

    // Fails with FormflowError::InvalidForm listing every field error
    let config = form.submit()?;
    println!("{config}");
    Ok(())
}
```

## Task Polling Example

```rust,no_run
use formflow_rs::{ClientConfig, HttpTaskClient, PollConfig, Result, SessionContext, TaskPoller};
use serde_json::{Value, json};

#[tokio::main]
async fn main() -> Result<()> {
    let session = SessionContext::new("access-token").with_org("acme");
    let client = HttpTaskClient::new(ClientConfig::new("http://localhost:8002/api"), &session)?;
    let poller = TaskPoller::new(client, PollConfig::default().with_timeout_ms(120_000))?;

    // Reject a second submission from the same UI region while this one runs
    let summary: Value = poller
        .run_exclusive("log-summary", "warehouse/v1/ask/42/summarize", &json!({}))
        .await?;
    println!("{summary}");
    Ok(())
}
```

## Error Handling

Every fallible operation returns `formflow_rs::Result`. Task terminal failures keep the backend's message:

```rust,no_run
use formflow_rs::{FormflowError, HttpTaskClient, TaskPoller};
use serde_json::Value;

async fn follow(poller: &TaskPoller<HttpTaskClient>, task_id: &str) {
    match poller.poll::<Value>(task_id).await {
        Ok(result) => println!("done: {result}"),
        Err(e) if e.is_task_failure() => println!("task failed: {}", e.user_message()),
        Err(FormflowError::Cancelled(_)) => {}
        Err(e) => println!("request failed: {}", e.user_message()),
    }
}
```
*/

pub mod engine;

// Re-export all public APIs for easier access
pub use engine::config::{ClientConfig, FormflowConfig, PollConfig, SessionContext};
pub use engine::error::{ErrorInfo, FormflowError, Result};
pub use engine::form::{
    Control, FieldDescriptor, FieldKind, FieldPath, FormState, RenderOptions, SpecCompiler, Widget,
    validate_form,
};
pub use engine::poll::{
    HttpTaskClient, InFlightRegistry, PollTrace, ProgressEntry, TaskBackend, TaskPoller,
    TaskProgress, TaskStatus,
};
pub use engine::ConnectorForm;
