//! REST API page bodies.
//!
//! Only the fields scribe reads or writes are modelled; anything else in a
//! server response is ignored on deserialize.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Representation name for storage-format bodies.
pub const STORAGE_REPRESENTATION: &str = "storage";

const PAGE_TYPE: &str = "page";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Space {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Response of `GET /rest/api/space`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpacesResponse {
    #[serde(default)]
    pub results: Vec<Space>,
}

/// Response of `GET /rest/api/content/search`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PagesResponse {
    #[serde(default)]
    pub results: Vec<Page>,
}

/// `GET` URL listing the spaces visible to the caller.
pub fn spaces_endpoint(base_url: &str, limit: u32, start: u32) -> String {
    format!(
        "{}/rest/api/space?limit={limit}&start={start}",
        base_url.trim_end_matches('/')
    )
}

/// `GET` URL searching the pages of one space, ordered by title.
pub fn search_endpoint(base_url: &str, space: &str, limit: u32, offset: u32) -> Result<String> {
    let space = space.trim();
    if space.is_empty() {
        bail!("space key is required");
    }
    let key = space.replace('\\', "\\\\").replace('"', "\\\"");
    let cql = format!("space = \"{key}\" AND type = \"{PAGE_TYPE}\" order by title");
    Ok(format!(
        "{}/rest/api/content/search?cql={}&limit={limit}&offset={offset}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&cql)
    ))
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Version {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Storage {
    pub value: String,
    pub representation: String,
}

impl Storage {
    pub fn new(value: String) -> Self {
        Self {
            value,
            representation: STORAGE_REPRESENTATION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Body {
    pub storage: Storage,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Links {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webui: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ancestor {
    pub id: String,
}

/// A page as returned by `GET /rest/api/content/{id}?expand=body.storage,version`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Page {
    pub id: String,

    #[serde(rename = "type", default = "default_page_type")]
    pub kind: String,

    #[serde(default)]
    pub status: Option<String>,

    pub title: String,

    #[serde(default)]
    pub space: Option<Space>,

    #[serde(default)]
    pub version: Option<Version>,

    #[serde(default)]
    pub body: Option<Body>,

    #[serde(rename = "_links", default)]
    pub links: Links,
}

fn default_page_type() -> String {
    PAGE_TYPE.to_string()
}

impl Page {
    /// Absolute browser link, when the response carries `_links.webui`.
    pub fn web_url(&self, base_url: &str) -> Option<String> {
        let webui = self.links.webui.as_deref().filter(|w| !w.is_empty())?;
        if webui.starts_with("http://") || webui.starts_with("https://") {
            return Some(webui.to_string());
        }
        Some(format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            webui.trim_start_matches('/')
        ))
    }

    /// Storage-format body, if the response was expanded with `body.storage`.
    pub fn storage(&self) -> Option<&str> {
        self.body.as_ref().map(|b| b.storage.value.as_str())
    }
}

/// Body for `POST /rest/api/content`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePageRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub space: Space,
    pub body: Body,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<Ancestor>,
}

impl CreatePageRequest {
    pub fn new(title: String, space: String, parent: Option<String>, storage: String) -> Self {
        Self {
            kind: PAGE_TYPE.to_string(),
            title,
            space: Space {
                id: None,
                key: space,
                name: None,
                kind: None,
            },
            body: Body {
                storage: Storage::new(storage),
            },
            ancestors: parent.into_iter().map(|id| Ancestor { id }).collect(),
        }
    }
}

/// Body for `PUT /rest/api/content/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatePageRequest {
    pub version: Version,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub body: Body,
}

impl UpdatePageRequest {
    /// Build the update for `current`, bumping its version by one.
    pub fn next_version(current: &Page, title: String, storage: String) -> Result<Self> {
        let Some(version) = &current.version else {
            bail!(
                "page {} has no version; fetch it with expand=version",
                current.id
            );
        };
        let number = version
            .number
            .checked_add(1)
            .context("page version number overflow")?;
        Ok(Self {
            version: Version { number },
            title,
            kind: current.kind.clone(),
            body: Body {
                storage: Storage::new(storage),
            },
        })
    }
}
