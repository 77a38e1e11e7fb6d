// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Batch manifest listing the pages of one chapter.
//!
//! ```json
//! {
//!   "title": "Chapter 12",
//!   "seed": 123456,
//!   "pages": [
//!     { "path": "p0.jpg", "width": 1000, "height": 1500 },
//!     { "path": "p1.jpg", "seed": "654321" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::pipeline::ImageJob;

/// Seed as written in the manifest, a JSON number or string.
///
/// It is kept as text and parsed when the page is restored, so a malformed
/// seed only fails its own page.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeedValue {
    Number(i64),
    Text(String),
}

impl SeedValue {
    pub fn to_text(&self) -> String {
        match self {
            SeedValue::Number(n) => n.to_string(),
            SeedValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PageEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub seed: Option<SeedValue>,
    #[serde(default)]
    pub width: Option<usize>,
    #[serde(default)]
    pub height: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub title: Option<String>,
    /// Seed shared by pages that do not set their own.
    #[serde(default)]
    pub seed: Option<SeedValue>,
    pub pages: Vec<PageEntry>,
}

impl Manifest {
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Output subdirectory for the chapter, derived from `title`.
    ///
    /// Path separators become `_`. A title that is blank or only dots would
    /// name the output directory or its parent, so it falls back to
    /// `"image"`.
    pub fn directory_name(&self) -> Option<String> {
        let title = self.title.as_deref()?.trim();
        let name = title.replace(['/', '\\'], "_");
        if name.chars().all(|c| c == '.') {
            return Some("image".to_owned());
        }
        Some(name)
    }

    /// Page path, relative paths taken from `base`.
    pub fn page_path(&self, index: usize, base: &Path) -> Option<PathBuf> {
        self.pages.get(index).map(|p| base.join(&p.path))
    }

    /// Job for page `index` with its already loaded `bytes`.
    pub fn job(&self, index: usize, bytes: Vec<u8>) -> Option<ImageJob> {
        let page = self.pages.get(index)?;
        let mut job = ImageJob::new(index, bytes);
        job.seed = page.seed.as_ref().or(self.seed.as_ref()).map(SeedValue::to_text);
        job.width = page.width;
        job.height = page.height;
        Some(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = r#"{
        "title": "Chapter 12",
        "seed": 123456,
        "pages": [
            { "path": "p0.jpg", "width": 1000, "height": 1500 },
            { "path": "/abs/p1.jpg", "seed": "654321" }
        ]
    }"#;

    #[test]
    fn page_seed_overrides_chapter_seed() {
        let m = Manifest::from_json(CHAPTER).unwrap();
        assert_eq!(m.title.as_deref(), Some("Chapter 12"));

        let j0 = m.job(0, vec![]).unwrap();
        assert_eq!(j0.seed.as_deref(), Some("123456"));
        assert_eq!((j0.width, j0.height), (Some(1000), Some(1500)));

        let j1 = m.job(1, vec![]).unwrap();
        assert_eq!(j1.seed.as_deref(), Some("654321"));
        assert_eq!(j1.index, 1);

        assert!(m.job(2, vec![]).is_none());
    }

    #[test]
    fn paths_resolve_against_base() {
        let m = Manifest::from_json(CHAPTER).unwrap();
        assert_eq!(
            m.page_path(0, Path::new("/dl")),
            Some(PathBuf::from("/dl/p0.jpg"))
        );
        assert_eq!(
            m.page_path(1, Path::new("/dl")),
            Some(PathBuf::from("/abs/p1.jpg"))
        );
    }

    #[test]
    fn directory_name_stays_inside_output() {
        let named = |title: &str| {
            let json = serde_json::json!({ "title": title, "pages": [] });
            Manifest::from_json(&json.to_string())
                .unwrap()
                .directory_name()
        };
        assert_eq!(named("Chapter 12").as_deref(), Some("Chapter 12"));
        assert_eq!(named("a/b\\c").as_deref(), Some("a_b_c"));
        assert_eq!(named("..").as_deref(), Some("image"));
        assert_eq!(named(".").as_deref(), Some("image"));
        assert_eq!(named(" ... ").as_deref(), Some("image"));
        assert_eq!(named("").as_deref(), Some("image"));
        assert_eq!(named("../x").as_deref(), Some(".._x"));

        let untitled = Manifest::from_json(r#"{ "pages": [] }"#).unwrap();
        assert_eq!(untitled.directory_name(), None);
    }

    #[test]
    fn rejects_missing_pages() {
        assert!(Manifest::from_json(r#"{ "title": "x" }"#).is_err());
        assert!(Manifest::from_json("[1, 2]").is_err());
    }

    #[test]
    fn no_seed_anywhere() {
        let m = Manifest::from_json(r#"{ "pages": [{ "path": "a.png" }] }"#).unwrap();
        assert_eq!(m.job(0, vec![]).unwrap().seed, None);
    }
}
