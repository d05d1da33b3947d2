//! Folder elements: pick one file out of a directory tree.
//!
//! The listing is read once per `(folder, suffix)` and reused for the
//! lifetime of the description.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde_yaml::Value;
use tracing::debug;

use super::Element;
use crate::description::{ready, Node, Outcome, Resolution, Resolver};
use crate::error::DescriptionError;
use crate::value::{as_index, kind_name, Bindings};

/// All files under `folder` (recursively) whose name ends with `suffix`, sorted.
pub fn files_with_suffix(folder: &Path, suffix: &str) -> io::Result<Vec<String>> {
    let mut found = Vec::new();
    let mut pending: Vec<PathBuf> = vec![folder.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.to_string_lossy().ends_with(suffix) {
                found.push(path.to_string_lossy().into_owned());
            }
        }
    }
    found.sort();
    Ok(found)
}

impl<'d> Resolver<'d> {
    pub(super) fn resolve_folder(
        &mut self,
        element: &Element,
        folder: &'d Node,
        suffix: &'d Node,
        index: Option<&'d Node>,
        seed: Option<&'d Node>,
        scope: &Bindings,
    ) -> Resolution {
        let folder = ready!(self.resolve_node(folder, scope)?);
        let suffix = ready!(self.resolve_node(suffix, scope)?);
        let (Some(folder), Some(suffix)) = (folder.as_str(), suffix.as_str()) else {
            return Err(DescriptionError::config(
                &element.name,
                format!(
                    "folder and suffix must be strings, got {} and {}",
                    kind_name(&folder),
                    kind_name(&suffix)
                ),
            ));
        };

        let key = (folder.to_string(), suffix.to_string());
        if !self.state.folders.contains_key(&key) {
            let files = files_with_suffix(Path::new(folder), suffix).map_err(|e| {
                DescriptionError::config(&element.name, format!("cannot read folder {folder}: {e}"))
            })?;
            if files.is_empty() {
                return Err(DescriptionError::config(
                    &element.name,
                    format!("folder {folder} is empty"),
                ));
            }
            debug!(element = %element.name, folder, suffix, files = files.len(), "folder enumerated");
            self.state.folders.insert(key.clone(), files);
        }

        let len = self.state.folders[&key].len();
        if self.is_init_frame {
            let files = &self.state.folders[&key];
            return Ok(Outcome::Ready(Value::Sequence(
                files.iter().cloned().map(Value::String).collect(),
            )));
        }

        let position = match index {
            Some(node) => {
                let value = ready!(self.resolve_node(node, scope)?);
                let index = as_index(&value).ok_or_else(|| {
                    DescriptionError::config(&element.name, "folder index must be an integer")
                })?;
                index.rem_euclid(len as i64) as usize
            }
            None => {
                let mut rng = ready!(self.element_rng(element, seed, scope)?);
                rng.gen_range(0..len)
            }
        };
        Ok(Outcome::Ready(Value::String(
            self.state.folders[&key][position].clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recursive_sorted_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.usd"), "").unwrap();
        fs::write(dir.path().join("a.usd"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("sub").join("c.usd"), "").unwrap();

        let files = files_with_suffix(dir.path(), ".usd").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| Path::new(f).strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.usd", "b.usd", "sub/c.usd"]);
    }

    #[test]
    fn test_missing_folder_is_error() {
        assert!(files_with_suffix(Path::new("/definitely/not/here"), ".usd").is_err());
    }
}
