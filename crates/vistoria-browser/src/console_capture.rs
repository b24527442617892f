use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use vistoria_core::ConsoleMessage;

/// Collects the page's console output so a failed scenario can report what
/// the application logged while things went wrong.
#[derive(Debug)]
pub struct ConsoleCapture {
    messages: Arc<Mutex<Vec<ConsoleMessage>>>,
    task: JoinHandle<()>,
}

impl ConsoleCapture {
    /// Subscribe to `Runtime.consoleAPICalled` events on the page.
    /// The Runtime domain must already be enabled.
    pub async fn attach(page: &Page) -> crate::Result<Self> {
        let mut events = page.event_listener::<EventConsoleApiCalled>().await?;
        let messages: Arc<Mutex<Vec<ConsoleMessage>>> = Arc::default();

        let sink = messages.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let message = render(&event);
                tracing::debug!("console [{}] {}", message.level, message.text);
                if let Ok(mut sink) = sink.lock() {
                    sink.push(message);
                }
            }
        });

        Ok(Self { messages, task })
    }

    /// Snapshot of everything captured so far.
    pub fn messages(&self) -> Vec<ConsoleMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Abort the listener task. Safe to call more than once.
    pub fn stop(&self) {
        self.task.abort();
    }
}

fn render(event: &EventConsoleApiCalled) -> ConsoleMessage {
    // The generated CDP enum serializes to its wire name ("log", "error", ...).
    let level = serde_json::to_value(&event.r#type)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| "log".to_string());

    let text = event
        .args
        .iter()
        .map(|arg| match &arg.value {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => arg.description.clone().unwrap_or_default(),
        })
        .collect::<Vec<_>>()
        .join(" ");

    ConsoleMessage { level, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Events are deserialized from wire JSON rather than built by hand so the
    // tests track the CDP schema, not the generated struct layout.
    fn event(args: serde_json::Value) -> EventConsoleApiCalled {
        serde_json::from_value(json!({
            "type": "error",
            "args": args,
            "executionContextId": 1,
            "timestamp": 0.0
        }))
        .unwrap()
    }

    #[test]
    fn test_render_joins_string_args() {
        let ev = event(json!([
            {"type": "string", "value": "Erro ao carregar clientes:"},
            {"type": "string", "value": "permission-denied"}
        ]));
        let msg = render(&ev);
        assert_eq!(msg.level, "error");
        assert_eq!(msg.text, "Erro ao carregar clientes: permission-denied");
    }

    #[test]
    fn test_render_falls_back_to_description() {
        let ev = event(json!([
            {"type": "object", "description": "TypeError: x is not a function"}
        ]));
        assert_eq!(render(&ev).text, "TypeError: x is not a function");
    }

    #[test]
    fn test_render_formats_non_string_values() {
        let ev = event(json!([{"type": "number", "value": 42}]));
        assert_eq!(render(&ev).text, "42");
    }
}
