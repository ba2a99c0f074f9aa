//! Widget descriptions and their resource wire format.
//!
//! A [`Widget`] is what a widget's `data.json` / `data.toml` declares. Every
//! optional field is an `Option` so presence is checked by the type system;
//! [`Widget::to_resource`] translates it into the vocabulary the registry
//! speaks.

use serde::{Deserialize, Serialize};

use crate::entry::DEFAULT_ROOT_COMPONENT;

/// MIME type of registered widget resources.
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";

/// Content security policy domains requested by a widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WidgetCsp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_domains: Option<Vec<String>>,
}

/// A widget description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Widget {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_border: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csp: Option<WidgetCsp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Root component the entry mounts. Defaults to `Widget`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl Widget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            enable_border: None,
            csp: None,
            domain: None,
            component: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_border(mut self) -> Self {
        self.enable_border = Some(true);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Add connect domains, skipping ones already present.
    pub fn add_connect_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let csp = self.csp.get_or_insert_with(WidgetCsp::default);
        push_unique(csp.connect_domains.get_or_insert_with(Vec::new), domains);
        self
    }

    /// Add resource domains, skipping ones already present.
    pub fn add_resource_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let csp = self.csp.get_or_insert_with(WidgetCsp::default);
        push_unique(csp.resource_domains.get_or_insert_with(Vec::new), domains);
        self
    }

    /// Component the synthesized entry renders.
    pub fn root_component(&self) -> &str {
        self.component.as_deref().unwrap_or(DEFAULT_ROOT_COMPONENT)
    }

    /// `ui://widget/<name>.html`
    pub fn uri(&self) -> String {
        format!("ui://widget/{}.html", self.name)
    }

    /// Check that every present string field is non-empty and that the root
    /// component is a plain identifier.
    pub fn validate(&self) -> Result<(), String> {
        non_empty("name", Some(&self.name))?;
        non_empty("description", self.description.as_ref())?;
        non_empty("domain", self.domain.as_ref())?;
        non_empty("component", self.component.as_ref())?;

        if let Some(component) = &self.component {
            let valid = component
                .chars()
                .enumerate()
                .all(|(i, c)| c == '_' || c == '$' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
            if !valid {
                return Err(format!("component must be a JS identifier, got `{component}`"));
            }
        }

        if let Some(csp) = &self.csp {
            for (field, domains) in [
                ("csp.connectDomains", &csp.connect_domains),
                ("csp.resourceDomains", &csp.resource_domains),
            ] {
                if let Some(domains) = domains {
                    if domains.iter().any(|d| d.trim().is_empty()) {
                        return Err(format!("{field} must be an array of non-empty strings"));
                    }
                }
            }
        }

        Ok(())
    }

    /// Translate into the registry's resource representation.
    pub fn to_resource(&self, html: impl Into<String>) -> WidgetResource {
        WidgetResource {
            uri: self.uri(),
            mime_type: WIDGET_MIME_TYPE.into(),
            text: html.into(),
            meta: WidgetResourceMeta {
                widget_description: self.description.clone(),
                widget_prefers_border: self.enable_border,
                widget_csp: self.csp.as_ref().map(|csp| ResourceCsp {
                    connect_domains: csp.connect_domains.clone(),
                    resource_domains: csp.resource_domains.clone(),
                }),
                widget_domain: self.domain.clone(),
            },
        }
    }
}

fn non_empty(field: &str, value: Option<&String>) -> Result<(), String> {
    match value {
        Some(v) if v.trim().is_empty() => Err(format!("{field} must be a non-empty string")),
        _ => Ok(()),
    }
}

fn push_unique<I, S>(target: &mut Vec<String>, domains: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for domain in domains {
        let domain = domain.into();
        if !target.contains(&domain) {
            target.push(domain);
        }
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// A widget as served by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetResource {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
    #[serde(rename = "_meta")]
    pub meta: WidgetResourceMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetResourceMeta {
    #[serde(
        rename = "openai/widgetDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_description: Option<String>,
    #[serde(
        rename = "openai/widgetPrefersBorder",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_prefers_border: Option<bool>,
    #[serde(
        rename = "openai/widgetCSP",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_csp: Option<ResourceCsp>,
    #[serde(
        rename = "openai/widgetDomain",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCsp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_domains: Option<Vec<String>>,
}
