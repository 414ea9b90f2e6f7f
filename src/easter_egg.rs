use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const EASTER_EGG_FILE_NAME: &str = "easter_egg.json";
pub const EASTER_EGG_OUTPUT_NAME: &str = "rosmontis【Experiment Files】.txt";
/// Every this many interactions one egg is delivered.
pub const INTERACTIONS_PER_EGG: u64 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EasterEgg {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EasterEggData {
    pub interact_count: u64,
    pub easter_eggs: Vec<EasterEgg>,
}

/// Counter file shared with the user, who edits the egg list by hand.
///
/// Every interaction re-reads the file and only rewrites `interact_count`, so
/// edits made while the pet runs survive.
#[derive(Debug)]
pub struct EasterEggStore {
    path: PathBuf,
    interact_count: u64,
}

impl EasterEggStore {
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            write_object(&path, default_object()?)?;
            info!(path = %path.display(), "created easter egg file");
            return Ok(Self {
                path,
                interact_count: 0,
            });
        }
        let interact_count = match read_data(&path) {
            Ok((_, data)) => data.interact_count,
            Err(err) => {
                warn!(?err, path = %path.display(), "easter egg file unreadable, counting from zero");
                0
            }
        };
        Ok(Self {
            path,
            interact_count,
        })
    }

    pub fn interact_count(&self) -> u64 {
        self.interact_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bumps the counter and returns an egg whenever it wraps back to zero.
    ///
    /// A file that no longer parses is left untouched and reported as an error.
    pub fn record_interaction<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<EasterEgg>> {
        let (mut object, data) = if self.path.exists() {
            read_data(&self.path)?
        } else {
            (Map::new(), EasterEggData::default())
        };

        let count = next_count(data.interact_count);
        object.insert("interact_count".to_owned(), Value::from(count));
        if !object.contains_key("easter_eggs") {
            object.insert("easter_eggs".to_owned(), Value::Array(Vec::new()));
        }
        write_object(&self.path, object)?;
        self.interact_count = count;

        if count != 0 {
            return Ok(None);
        }
        let chosen = data.easter_eggs.choose(rng).cloned();
        if chosen.is_none() {
            info!(path = %self.path.display(), "interaction milestone reached but no eggs are defined");
        }
        Ok(chosen)
    }
}

pub fn next_count(count: u64) -> u64 {
    (count % INTERACTIONS_PER_EGG + 1) % INTERACTIONS_PER_EGG
}

fn default_object() -> Result<Map<String, Value>> {
    match serde_json::to_value(EasterEggData::default()).context("failed serializing easter eggs")? {
        Value::Object(object) => Ok(object),
        _ => anyhow::bail!("easter egg data did not serialize to a json object"),
    }
}

fn read_data(path: &Path) -> Result<(Map<String, Value>, EasterEggData)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading easter eggs at {}", path.display()))?;
    let object = serde_json::from_str::<Map<String, Value>>(&text)
        .with_context(|| format!("invalid easter egg json at {}", path.display()))?;
    let data = serde_json::from_value::<EasterEggData>(Value::Object(object.clone()))
        .with_context(|| format!("invalid easter egg data at {}", path.display()))?;
    Ok((object, data))
}

fn write_object(path: &Path, object: Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    let payload = serde_json::to_string_pretty(&Value::Object(object))
        .context("failed serializing easter eggs")?;
    fs::write(path, payload)
        .with_context(|| format!("failed writing easter eggs at {}", path.display()))?;
    Ok(())
}

pub fn desktop_dir() -> Option<PathBuf> {
    dirs::desktop_dir().or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
}

/// Writes the egg as a text file into `dir` and returns the written path.
pub fn deliver(egg: &EasterEgg, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(EASTER_EGG_OUTPUT_NAME);
    fs::write(&path, format!("{}\n\n{}", egg.title, egg.content))
        .with_context(|| format!("failed writing easter egg to {}", path.display()))?;
    info!(path = %path.display(), title = %egg.title, "delivered easter egg");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf, time::SystemTime};

    use rand::{rngs::StdRng, SeedableRng};

    use serde_json::Value;

    use super::{
        deliver, next_count, EasterEgg, EasterEggData, EasterEggStore, EASTER_EGG_OUTPUT_NAME,
    };

    fn temp_path(tag: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("clock should be valid")
            .as_nanos();
        std::env::temp_dir().join(format!("desktop_pet_egg_{tag}_{unique}"))
    }

    #[test]
    fn missing_file_is_created_with_zero_count() {
        let path = temp_path("create").with_extension("json");
        let store = EasterEggStore::load_or_create(&path).expect("store should be created");
        let raw = fs::read_to_string(&path).expect("file should exist");
        fs::remove_file(&path).ok();

        assert_eq!(store.interact_count(), 0);
        let parsed: EasterEggData = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(parsed, EasterEggData::default());
    }

    #[test]
    fn counter_wraps_at_twenty_and_yields_an_egg() {
        let path = temp_path("wrap").with_extension("json");
        let data = EasterEggData {
            interact_count: 18,
            easter_eggs: vec![EasterEgg {
                title: "Record 7".to_owned(),
                content: "Subject shows signs of boredom.".to_owned(),
            }],
        };
        fs::write(&path, serde_json::to_string(&data).expect("serialize")).expect("write");

        let mut rng = StdRng::seed_from_u64(7);
        let mut store = EasterEggStore::load_or_create(&path).expect("load");
        let first = store.record_interaction(&mut rng).expect("record");
        let second = store.record_interaction(&mut rng).expect("record");
        let reloaded = EasterEggStore::load_or_create(&path).expect("reload");
        fs::remove_file(&path).ok();

        assert!(first.is_none());
        assert_eq!(second.map(|egg| egg.title), Some("Record 7".to_owned()));
        assert_eq!(reloaded.interact_count(), 0);
    }

    #[test]
    fn milestone_without_eggs_yields_nothing() {
        let path = temp_path("empty").with_extension("json");
        fs::write(&path, r#"{"interact_count": 19}"#).expect("write");
        let mut rng = StdRng::seed_from_u64(1);
        let mut store = EasterEggStore::load_or_create(&path).expect("load");
        let egg = store.record_interaction(&mut rng).expect("record");
        fs::remove_file(&path).ok();
        assert!(egg.is_none());
        assert_eq!(store.interact_count(), 0);
    }

    #[test]
    fn deliver_writes_title_and_content() {
        let dir = temp_path("deliver");
        fs::create_dir_all(&dir).expect("dir");
        let egg = EasterEgg {
            title: "Title".to_owned(),
            content: "Body".to_owned(),
        };
        let written = deliver(&egg, &dir).expect("deliver");
        let text = fs::read_to_string(&written).expect("read");
        fs::remove_dir_all(&dir).ok();

        assert!(written.ends_with(EASTER_EGG_OUTPUT_NAME));
        assert_eq!(text, "Title\n\nBody");
    }

    #[test]
    fn missing_parent_folder_is_created() {
        let dir = temp_path("fresh_install");
        let path = dir.join("desktop-pet").join("easter_egg.json");
        let store = EasterEggStore::load_or_create(&path).expect("store should be created");
        let exists = path.is_file();
        fs::remove_dir_all(&dir).ok();

        assert!(exists);
        assert_eq!(store.interact_count(), 0);
    }

    #[test]
    fn eggs_added_while_running_are_kept() {
        let path = temp_path("edited").with_extension("json");
        let mut store = EasterEggStore::load_or_create(&path).expect("create");
        fs::write(
            &path,
            r#"{"interact_count": 19, "easter_eggs": [{"title": "T", "content": "C"}], "note": "mine"}"#,
        )
        .expect("user edit");

        let mut rng = StdRng::seed_from_u64(3);
        let egg = store.record_interaction(&mut rng).expect("record");
        let raw = fs::read_to_string(&path).expect("read back");
        fs::remove_file(&path).ok();

        assert_eq!(egg.map(|egg| egg.title), Some("T".to_owned()));
        let saved: Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(saved["interact_count"], 0);
        assert_eq!(saved["easter_eggs"][0]["content"], "C");
        assert_eq!(saved["note"], "mine");
    }

    #[test]
    fn broken_file_is_never_overwritten() {
        let path = temp_path("broken").with_extension("json");
        let broken = r#"{"interact_count": 3, "easter_eggs": [{"title": "T", "content": "C"},]}"#;
        fs::write(&path, broken).expect("write");

        let mut rng = StdRng::seed_from_u64(5);
        let mut store = EasterEggStore::load_or_create(&path).expect("load");
        let result = store.record_interaction(&mut rng);
        let raw = fs::read_to_string(&path).expect("read back");
        fs::remove_file(&path).ok();

        assert!(result.is_err());
        assert_eq!(raw, broken);
    }

    #[test]
    fn huge_stored_count_does_not_overflow() {
        assert_eq!(next_count(u64::MAX), (u64::MAX % 20 + 1) % 20);
        assert_eq!(next_count(19), 0);
        assert_eq!(next_count(0), 1);

        let path = temp_path("huge").with_extension("json");
        fs::write(&path, r#"{"interact_count": 4294967295}"#).expect("write");
        let mut rng = StdRng::seed_from_u64(9);
        let mut store = EasterEggStore::load_or_create(&path).expect("load");
        let egg = store.record_interaction(&mut rng).expect("record");
        fs::remove_file(&path).ok();

        assert!(egg.is_none());
        assert_eq!(store.interact_count(), 16);
    }
}
