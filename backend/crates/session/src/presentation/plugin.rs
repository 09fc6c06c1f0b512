//! Plugin Registry
//!
//! Extension points for request handlers and UI sections. The registry is
//! filled once at startup and read-only afterwards; handler plugins are
//! mounted behind the live-session middleware.

use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use crate::error::{SessionError, SessionResult};

/// Paths owned by the session router itself
pub const RESERVED_PATHS: [&str; 4] = ["/session", "/signin", "/signout", "/plugins/manifest"];

/// A plugin that serves requests under its own URI and/or ships a
/// client-side script
pub trait HandlerPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Path prefix the plugin handles; `None` for script-only plugins
    fn get_uri(&self) -> Option<&str>;

    /// Routes mounted under [`get_uri`](Self::get_uri)
    fn router(&self) -> Router {
        Router::new()
    }

    /// Script to include at top level, if any
    fn get_js(&self) -> Option<&str> {
        None
    }
}

/// A plugin contributing a section to the configuration screen
pub trait UiModulePlugin: Send + Sync {
    fn name(&self) -> &str;

    fn get_template(&self) -> &str;
}

/// What the front end needs to load plugin assets
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub javascripts: Vec<String>,
    pub ui_templates: Vec<String>,
}

#[derive(Default)]
pub struct PluginRegistry {
    handlers: Vec<Arc<dyn HandlerPlugin>>,
    ui_modules: Vec<Arc<dyn UiModulePlugin>>,
}

fn overlaps(a: &str, b: &str) -> bool {
    a == b || a.starts_with(&format!("{b}/")) || b.starts_with(&format!("{a}/"))
}

fn is_valid_uri(uri: &str) -> bool {
    uri.len() > 1
        && uri.starts_with('/')
        && !uri.ends_with('/')
        && !uri.contains("//")
        && uri
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
}

fn is_valid_asset(path: &str) -> bool {
    !path.is_empty() && !path.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'')
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler plugin; its URI must be well formed and must not
    /// overlap reserved paths or other plugins
    pub fn register_handler(&mut self, plugin: Arc<dyn HandlerPlugin>) -> SessionResult<()> {
        if let Some(uri) = plugin.get_uri() {
            if !is_valid_uri(uri) {
                return Err(SessionError::Plugin(format!(
                    "{}: invalid uri {uri:?}",
                    plugin.name()
                )));
            }
            if RESERVED_PATHS.iter().any(|r| overlaps(uri, r)) {
                return Err(SessionError::Plugin(format!(
                    "{}: uri {uri} is reserved",
                    plugin.name()
                )));
            }
            let taken = self
                .handlers
                .iter()
                .filter_map(|h| h.get_uri())
                .any(|other| overlaps(uri, other));
            if taken {
                return Err(SessionError::Plugin(format!(
                    "{}: uri {uri} already mounted",
                    plugin.name()
                )));
            }
        }

        if let Some(js) = plugin.get_js() {
            if !is_valid_asset(js) {
                return Err(SessionError::Plugin(format!(
                    "{}: invalid script path {js:?}",
                    plugin.name()
                )));
            }
        }

        tracing::info!(
            plugin = plugin.name(),
            uri = plugin.get_uri(),
            js = plugin.get_js(),
            "Registered handler plugin"
        );
        self.handlers.push(plugin);
        Ok(())
    }

    pub fn register_ui_module(&mut self, plugin: Arc<dyn UiModulePlugin>) -> SessionResult<()> {
        if !is_valid_asset(plugin.get_template()) {
            return Err(SessionError::Plugin(format!(
                "{}: invalid template {:?}",
                plugin.name(),
                plugin.get_template()
            )));
        }
        tracing::info!(
            plugin = plugin.name(),
            template = plugin.get_template(),
            "Registered UI module plugin"
        );
        self.ui_modules.push(plugin);
        Ok(())
    }

    /// Plugins that serve requests, with their mount point
    pub fn mounted(&self) -> impl Iterator<Item = (&str, &Arc<dyn HandlerPlugin>)> {
        self.handlers
            .iter()
            .filter_map(|h| h.get_uri().map(|uri| (uri, h)))
    }

    pub fn javascripts(&self) -> Vec<String> {
        self.handlers
            .iter()
            .filter_map(|h| h.get_js())
            .map(str::to_string)
            .collect()
    }

    pub fn ui_templates(&self) -> Vec<String> {
        self.ui_modules
            .iter()
            .map(|m| m.get_template().to_string())
            .collect()
    }

    pub fn manifest(&self) -> PluginManifest {
        PluginManifest {
            javascripts: self.javascripts(),
            ui_templates: self.ui_templates(),
        }
    }
}
