//! Registration adapter.
//!
//! The registry is an external collaborator: it receives a resource name, a
//! URI, and an async reader that produces the resource contents on request.
//! [`InMemoryRegistry`] is a DashMap-backed implementation for embedding and
//! tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{AssembledArtifact, Widget, WidgetError, WidgetResource};

/// What a resource read returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContents {
    pub contents: Vec<WidgetResource>,
}

pub type ResourceFuture = Pin<Box<dyn Future<Output = ResourceContents> + Send>>;

/// Async reader invoked with the requested URI.
pub type ResourceReader = Arc<dyn Fn(&str) -> ResourceFuture + Send + Sync>;

/// A registry that serves widget resources.
pub trait WidgetRegistry {
    fn register_resource(
        &self,
        name: &str,
        uri: &str,
        reader: ResourceReader,
    ) -> Result<(), WidgetError>;
}

/// Register one assembled widget.
///
/// Refuses empty HTML: a registered resource is always a fully assembled
/// fragment.
pub fn register_artifact<R>(
    registry: &R,
    widget: &Widget,
    artifact: &AssembledArtifact,
) -> Result<(), WidgetError>
where
    R: WidgetRegistry + ?Sized,
{
    if artifact.html.trim().is_empty() {
        return Err(WidgetError::RegistrationError(format!(
            "widget `{}` has no assembled html",
            widget.name
        )));
    }

    let resource = widget.to_resource(artifact.html.clone());
    let uri = resource.uri.clone();
    let reader: ResourceReader = Arc::new(move |_uri: &str| {
        let contents = ResourceContents {
            contents: vec![resource.clone()],
        };
        Box::pin(async move { contents }) as ResourceFuture
    });

    registry.register_resource(&widget.name, &uri, reader)?;
    debug!("registered {} as {uri}", widget.name);
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory registry
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct RegisteredResource {
    name: String,
    reader: ResourceReader,
}

/// Thread-safe in-memory registry keyed by URI.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    resources: Arc<DashMap<String, RegisteredResource>>,
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRegistry")
            .field("uris", &self.uris())
            .finish()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered URIs, sorted.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.resources.iter().map(|r| r.key().clone()).collect();
        uris.sort();
        uris
    }

    /// Name a URI was registered under.
    pub fn name_of(&self, uri: &str) -> Option<String> {
        self.resources.get(uri).map(|r| r.value().name.clone())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Invoke the reader registered for `uri`.
    pub async fn read(&self, uri: &str) -> Option<ResourceContents> {
        let reader = self.resources.get(uri).map(|r| Arc::clone(&r.value().reader))?;
        Some(reader(uri).await)
    }
}

impl WidgetRegistry for InMemoryRegistry {
    fn register_resource(
        &self,
        name: &str,
        uri: &str,
        reader: ResourceReader,
    ) -> Result<(), WidgetError> {
        if self.resources.contains_key(uri) {
            return Err(WidgetError::RegistrationError(format!(
                "resource {uri} is already registered"
            )));
        }
        self.resources.insert(
            uri.to_string(),
            RegisteredResource {
                name: name.to_string(),
                reader,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn artifact(name: &str, html: &str) -> AssembledArtifact {
        AssembledArtifact {
            widget_name: name.into(),
            directory_name: name.into(),
            html: html.into(),
        }
    }

    #[tokio::test]
    async fn register_and_read() {
        let registry = InMemoryRegistry::new();
        let widget = Widget::new("greeting").with_description("Says hello");
        register_artifact(&registry, &widget, &artifact("greeting", "<div></div>")).unwrap();

        assert_eq!(registry.uris(), vec!["ui://widget/greeting.html"]);
        assert_eq!(
            registry.name_of("ui://widget/greeting.html").as_deref(),
            Some("greeting")
        );

        let contents = registry.read("ui://widget/greeting.html").await.unwrap();
        assert_eq!(contents.contents.len(), 1);
        assert_eq!(contents.contents[0].text, "<div></div>");
        assert_eq!(contents.contents[0].mime_type, "text/html+skybridge");
        assert_eq!(
            contents.contents[0].meta.widget_description.as_deref(),
            Some("Says hello")
        );
    }

    #[tokio::test]
    async fn read_unknown_uri() {
        let registry = InMemoryRegistry::new();
        assert!(registry.read("ui://widget/missing.html").await.is_none());
    }

    #[test]
    fn rejects_empty_html() {
        let registry = InMemoryRegistry::new();
        let err = register_artifact(&registry, &Widget::new("w"), &artifact("w", "  ")).unwrap_err();
        assert!(matches!(err, WidgetError::RegistrationError(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_duplicate_uri() {
        let registry = InMemoryRegistry::new();
        let widget = Widget::new("w");
        register_artifact(&registry, &widget, &artifact("w", "<div></div>")).unwrap();
        let err = register_artifact(&registry, &widget, &artifact("w", "<div></div>")).unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(registry.len(), 1);
    }
}
