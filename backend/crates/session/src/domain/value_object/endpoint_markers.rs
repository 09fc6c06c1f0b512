//! Endpoint Markers
//!
//! The three opaque endpoint markers (shell, upload, notebook) a live
//! container is reachable on. All three are `"0"` while a container loads.

/// Marker value used for every endpoint while a container is loading
pub const LOADING_MARKER: &str = "0";

const MAX_MARKER_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMarkers {
    pub shell: String,
    pub upload: String,
    pub ipynb: String,
}

impl EndpointMarkers {
    pub fn new(
        shell: impl Into<String>,
        upload: impl Into<String>,
        ipynb: impl Into<String>,
    ) -> Self {
        Self {
            shell: shell.into(),
            upload: upload.into(),
            ipynb: ipynb.into(),
        }
    }

    /// Markers of a container that is still loading
    pub fn loading() -> Self {
        Self::new(LOADING_MARKER, LOADING_MARKER, LOADING_MARKER)
    }

    pub fn is_loading(&self) -> bool {
        self.as_array().iter().all(|m| *m == LOADING_MARKER)
    }

    pub fn as_array(&self) -> [&str; 3] {
        [&self.shell, &self.upload, &self.ipynb]
    }

    /// Shape check for client-supplied marker values
    pub fn is_well_formed(marker: &str) -> bool {
        !marker.is_empty()
            && marker.len() <= MAX_MARKER_LEN
            && marker
                .chars()
                .all(|c| c.is_ascii_graphic() && c != ';' && c != ',')
    }
}
