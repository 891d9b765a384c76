//! Script, preload and stylesheet tags for the code chunks a render used.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::AssetError;
use crate::head::escape_attr;

/// Maps chunk names to the tags that load them.
pub trait AssetManifest: Send + Sync {
    /// `<script>` tags, emitted before `</body>`.
    fn script_tags(&self, chunks: &[String]) -> String;

    /// `<link>` tags (preloads), emitted before `</head>`.
    fn link_tags(&self, chunks: &[String]) -> String;

    /// Stylesheet tags, emitted before `</head>`.
    fn style_tags(&self, chunks: &[String]) -> String;
}

/// A manifest that emits nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetManifest for NoAssets {
    fn script_tags(&self, _chunks: &[String]) -> String {
        String::new()
    }

    fn link_tags(&self, _chunks: &[String]) -> String {
        String::new()
    }

    fn style_tags(&self, _chunks: &[String]) -> String {
        String::new()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum ChunkAssets {
    One(String),
    Many(Vec<String>),
}

impl ChunkAssets {
    fn files(&self) -> &[String] {
        match self {
            ChunkAssets::One(file) => std::slice::from_ref(file),
            ChunkAssets::Many(files) => files,
        }
    }
}

/// A bundler stats file.
///
/// ```json
/// {
///   "publicPath": "/static/",
///   "entrypoints": ["main"],
///   "assetsByChunkName": {"main": ["main.js", "main.css"], "news": "news.js"}
/// }
/// ```
///
/// Entrypoint chunks are always loaded, ahead of the chunks the render used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadableStats {
    #[serde(rename = "publicPath", default)]
    public_path: String,

    #[serde(default)]
    entrypoints: Vec<String>,

    #[serde(rename = "assetsByChunkName", default)]
    assets_by_chunk_name: BTreeMap<String, ChunkAssets>,
}

impl LoadableStats {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        debug!("Reading {}...", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Entrypoints then `chunks`, without duplicates, in that order.
    fn chunk_order<'a>(&'a self, chunks: &'a [String]) -> Vec<&'a str> {
        let mut order: Vec<&str> = Vec::new();
        for chunk in self.entrypoints.iter().chain(chunks) {
            if !order.contains(&chunk.as_str()) {
                order.push(chunk.as_str());
            }
        }
        order
    }

    fn files<'a>(&'a self, chunks: &'a [String], extension: &str) -> Vec<(&'a str, String)> {
        let mut files = Vec::new();
        for chunk in self.chunk_order(chunks) {
            let Some(assets) = self.assets_by_chunk_name.get(chunk) else {
                continue;
            };
            for file in assets.files() {
                if file.ends_with(extension) {
                    files.push((chunk, format!("{}{}", self.public_path, file)));
                }
            }
        }
        files
    }

    fn required_chunks<'a>(&'a self, chunks: &'a [String]) -> Vec<&'a str> {
        self.chunk_order(chunks)
            .into_iter()
            .filter(|chunk| !self.entrypoints.iter().any(|e| e.as_str() == *chunk))
            .collect()
    }
}

impl AssetManifest for LoadableStats {
    fn script_tags(&self, chunks: &[String]) -> String {
        let required = serde_json::to_string(&self.required_chunks(chunks))
            .unwrap_or_else(|_| "[]".to_string());
        let mut out = format!(
            "<script id=\"__LOADABLE_REQUIRED_CHUNKS__\" type=\"application/json\">{}</script>",
            required.replace('<', "\\u003c")
        );
        for (chunk, src) in self.files(chunks, ".js") {
            out.push_str(&format!(
                "<script async data-chunk=\"{}\" src=\"{}\"></script>",
                escape_attr(chunk),
                escape_attr(&src)
            ));
        }
        out
    }

    fn link_tags(&self, chunks: &[String]) -> String {
        self.files(chunks, ".js")
            .into_iter()
            .map(|(chunk, href)| {
                format!(
                    "<link data-chunk=\"{}\" rel=\"preload\" as=\"script\" href=\"{}\">",
                    escape_attr(chunk),
                    escape_attr(&href)
                )
            })
            .collect()
    }

    fn style_tags(&self, chunks: &[String]) -> String {
        self.files(chunks, ".css")
            .into_iter()
            .map(|(chunk, href)| {
                format!(
                    "<link data-chunk=\"{}\" rel=\"stylesheet\" href=\"{}\">",
                    escape_attr(chunk),
                    escape_attr(&href)
                )
            })
            .collect()
    }
}
